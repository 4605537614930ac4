//! Form field checks shared by the mutations.

pub fn validate_username(username: &str) -> Option<String> {
    (username.chars().count() < 3).then(|| "Usernames must be at least 3 characters long".into())
}

pub fn validate_password(password: &str) -> Option<String> {
    (password.chars().count() < 6).then(|| "Passwords must be at least 6 characters long".into())
}

pub fn validate_joke_content(content: &str) -> Option<String> {
    (content.chars().count() < 10).then(|| "That joke is too short".into())
}

pub fn validate_joke_name(name: &str) -> Option<String> {
    (name.chars().count() < 3).then(|| "That joke's name is too short".into())
}
