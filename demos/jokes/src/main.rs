use graphql_route::Executable;
use jokes::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let schema = jokes::schema(Store::seeded());
    Executable::new(schema.clone())
        .sdl(schema.sdl())
        .configuration(jokes::default_configuration())
        .routes(jokes::routes::router)
        .start()
        .await
}
