//! The jokes GraphQL schema.

use std::sync::Arc;

use async_graphql::ComplexObject;
use async_graphql::Context;
use async_graphql::EmptySubscription;
use async_graphql::Enum;
use async_graphql::ID;
use async_graphql::Object;
use async_graphql::Schema;
use async_graphql::SimpleObject;
use graphql_route::RequestContext;
use graphql_route::error::error_with_status;
use http::StatusCode;
use http::header::SET_COOKIE;

use crate::session;
use crate::store::JokeListing;
use crate::store::JokeRecord;
use crate::store::Order;
use crate::store::Store;
use crate::store::UserRecord;
use crate::validators::validate_joke_content;
use crate::validators::validate_joke_name;
use crate::validators::validate_password;
use crate::validators::validate_username;

pub type JokesSchema = Schema<Query, Mutation, EmptySubscription>;

const NOT_FOUND: &str = "NOT_FOUND";

pub fn build(store: Arc<Store>) -> JokesSchema {
    Schema::build(Query, Mutation, EmptySubscription)
        .data(store)
        .finish()
}

fn store<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Arc<Store>> {
    ctx.data::<Arc<Store>>()
}

/// A User
#[derive(SimpleObject, Clone, Debug)]
pub struct User {
    id: ID,
    username: String,
}

impl From<UserRecord> for User {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id.into(),
            username: user.username,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex)]
pub struct Joke {
    id: ID,
    name: String,
    content: String,
    #[graphql(skip)]
    jokster_id: String,
}

impl From<JokeRecord> for Joke {
    fn from(joke: JokeRecord) -> Self {
        Self {
            id: joke.id.into(),
            name: joke.name,
            content: joke.content,
            jokster_id: joke.jokster_id,
        }
    }
}

#[ComplexObject]
impl Joke {
    async fn jokster(&self, ctx: &Context<'_>) -> async_graphql::Result<User> {
        store(ctx)?
            .user(&self.jokster_id)
            .await
            .map(User::from)
            .ok_or_else(|| format!("jokster {} is gone", self.jokster_id).into())
    }
}

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
#[graphql(rename_items = "camelCase")]
pub enum OrderJokesBy {
    CreatedAt,
}

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
#[graphql(rename_items = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
#[graphql(rename_items = "lowercase")]
pub enum LoginType {
    Login,
    Register,
}

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
#[graphql(rename_items = "lowercase")]
pub enum Method {
    Delete,
}

#[derive(SimpleObject, Clone, Debug, Default)]
pub struct LoginFieldErrors {
    username: Option<String>,
    password: Option<String>,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct LoginFields {
    login_type: String,
    username: String,
    password: String,
}

#[derive(SimpleObject, Clone, Debug, Default)]
pub struct LoginResult {
    form_error: Option<String>,
    field_errors: Option<LoginFieldErrors>,
    fields: Option<LoginFields>,
}

#[derive(SimpleObject, Clone, Debug, Default)]
pub struct CreateJokeFieldErrors {
    name: Option<String>,
    content: Option<String>,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CreateJokeFields {
    name: String,
    content: String,
}

#[derive(SimpleObject, Clone, Debug, Default)]
pub struct CreateJokeResult {
    field_errors: Option<CreateJokeFieldErrors>,
    fields: Option<CreateJokeFields>,
    joke: Option<Joke>,
}

pub struct Query;

#[Object]
impl Query {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<User>> {
        let Some(user_id) = session::user_id(ctx).await? else {
            return Ok(None);
        };
        Ok(store(ctx)?.user(&user_id).await.map(User::from))
    }

    async fn jokes(
        &self,
        ctx: &Context<'_>,
        take: Option<i32>,
        skip: Option<i32>,
        order_by: Option<OrderJokesBy>,
        order_direction: Option<OrderDirection>,
    ) -> async_graphql::Result<Vec<Joke>> {
        // ordering needs both arguments
        let order = match (order_by, order_direction) {
            (Some(OrderJokesBy::CreatedAt), Some(OrderDirection::Asc)) => Some(Order::Ascending),
            (Some(OrderJokesBy::CreatedAt), Some(OrderDirection::Desc)) => {
                Some(Order::Descending)
            }
            _ => None,
        };
        let listing = JokeListing {
            take: take.map(|take| usize::try_from(take).unwrap_or(0)),
            skip: skip.map(|skip| usize::try_from(skip).unwrap_or(0)),
            order,
        };
        Ok(store(ctx)?
            .jokes(listing)
            .await
            .into_iter()
            .map(Joke::from)
            .collect())
    }

    async fn joke(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<Joke>> {
        Ok(store(ctx)?.joke(&id).await.map(Joke::from))
    }

    async fn random_joke(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Joke>> {
        Ok(store(ctx)?.random_joke().await.map(Joke::from))
    }
}

pub struct Mutation;

#[Object]
impl Mutation {
    async fn login(
        &self,
        ctx: &Context<'_>,
        login_type: LoginType,
        username: String,
        password: String,
        #[graphql(default_with = "Some(\"/jokes\".to_string())")]
        redirect_to: Option<String>,
    ) -> async_graphql::Result<LoginResult> {
        // an empty hidden form field falls back to the default too
        let redirect_to = redirect_to
            .filter(|redirect_to| !redirect_to.is_empty())
            .unwrap_or_else(|| "/jokes".to_string());

        let fields = LoginFields {
            login_type: match login_type {
                LoginType::Login => "login",
                LoginType::Register => "register",
            }
            .to_string(),
            username: username.clone(),
            password: password.clone(),
        };
        let field_errors = LoginFieldErrors {
            username: validate_username(&username),
            password: validate_password(&password),
        };
        if field_errors.username.is_some() || field_errors.password.is_some() {
            return Ok(LoginResult {
                field_errors: Some(field_errors),
                fields: Some(fields),
                ..Default::default()
            });
        }

        let store = store(ctx)?;
        let user = match login_type {
            LoginType::Login => match store.login(&username, &password).await {
                Some(user) => user,
                None => {
                    return Ok(LoginResult {
                        form_error: Some("Username/Password combination is incorrect".into()),
                        fields: Some(fields),
                        ..Default::default()
                    });
                }
            },
            LoginType::Register => match store.register(&username, &password).await {
                Ok(user) => user,
                Err(err) => {
                    return Ok(LoginResult {
                        form_error: Some(err.to_string()),
                        fields: Some(fields),
                        ..Default::default()
                    });
                }
            },
        };

        let session_id = store.create_session(&user.id).await;
        ctx.data::<RequestContext>()?.redirect_with(
            &redirect_to,
            SET_COOKIE,
            &session::session_cookie(&session_id),
        )?;
        Ok(LoginResult {
            fields: Some(fields),
            ..Default::default()
        })
    }

    async fn logout(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<bool>> {
        let context = ctx.data::<RequestContext>()?;
        if let Some(session_id) = session::session_id(context.request()) {
            store(ctx)?.destroy_session(&session_id).await;
        }
        context.redirect_with("/login", SET_COOKIE, &session::expired_cookie())?;
        Ok(Some(true))
    }

    async fn create_joke(
        &self,
        ctx: &Context<'_>,
        name: String,
        content: String,
    ) -> async_graphql::Result<Option<CreateJokeResult>> {
        let user_id = session::require_user_id(ctx).await?;

        let field_errors = CreateJokeFieldErrors {
            name: validate_joke_name(&name),
            content: validate_joke_content(&content),
        };
        if field_errors.name.is_some() || field_errors.content.is_some() {
            return Ok(Some(CreateJokeResult {
                field_errors: Some(field_errors),
                fields: Some(CreateJokeFields { name, content }),
                ..Default::default()
            }));
        }

        let joke = store(ctx)?.create_joke(&user_id, &name, &content).await;
        ctx.data::<RequestContext>()?
            .redirect_to(&format!("/jokes/{}", joke.id))?;
        Ok(Some(CreateJokeResult {
            joke: Some(joke.into()),
            ..Default::default()
        }))
    }

    async fn edit_joke(
        &self,
        ctx: &Context<'_>,
        method: Method,
        id: ID,
    ) -> async_graphql::Result<Option<Joke>> {
        match method {
            Method::Delete => {
                let user_id = session::require_user_id(ctx).await?;
                let store = store(ctx)?;
                let Some(joke) = store.joke(&id).await else {
                    return Err(error_with_status(
                        "Can't delete what does not exist",
                        NOT_FOUND,
                        StatusCode::NOT_FOUND,
                    ));
                };
                if joke.jokster_id != user_id {
                    return Err(error_with_status(
                        "Pssh, nice try. That's not your joke",
                        session::UNAUTHORIZED,
                        StatusCode::UNAUTHORIZED,
                    ));
                }
                store.delete_joke(&id).await;
                ctx.data::<RequestContext>()?.redirect_to("/jokes")?;
                Ok(Some(joke.into()))
            }
        }
    }
}
