//! BDD step definitions for configuration loading

use std::io::Write;

use cucumber::{given, then, when};

use nutrimatic::{load_config, Config};

use crate::world::NutrimaticWorld;

#[given(expr = "a config file with backend url {string} and anon key {string}")]
fn config_file(world: &mut NutrimaticWorld, url: String, key: String) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let json = serde_json::json!({
        "server": { "port": 9000 },
        "backend": { "url": url, "anon_key": key }
    });
    file.write_all(json.to_string().as_bytes()).unwrap();
    world.config_file = Some(file);
}

#[given(expr = "the environment variable {string} is {string}")]
fn env_var(world: &mut NutrimaticWorld, name: String, value: String) {
    world.env.insert(name, value);
}

#[when("the configuration is loaded")]
fn load(world: &mut NutrimaticWorld) {
    let mut config = match &world.config_file {
        Some(file) => load_config(file.path()).unwrap(),
        None => Config::default(),
    };
    let env = world.env.clone();
    config.apply_env(|key| env.get(key).cloned());
    world.config = Some(config);
}

fn loaded(world: &NutrimaticWorld) -> &Config {
    world.config.as_ref().expect("not loaded")
}

#[then(expr = "the backend url should be {string}")]
fn backend_url(world: &mut NutrimaticWorld, expected: String) {
    assert_eq!(loaded(world).backend.url, expected);
}

#[then("the backend should be configured")]
fn backend_configured(world: &mut NutrimaticWorld) {
    assert!(loaded(world).backend.is_configured());
}

#[then("the backend should not be configured")]
fn backend_not_configured(world: &mut NutrimaticWorld) {
    assert!(!loaded(world).backend.is_configured());
}

#[then(expr = "the server port should be {int}")]
fn server_port(world: &mut NutrimaticWorld, expected: u16) {
    assert_eq!(loaded(world).server.port, expected);
}

#[then("session cookies should be marked secure")]
fn cookies_secure(world: &mut NutrimaticWorld) {
    assert!(loaded(world).server.secure_cookies);
}

#[then(expr = "the webhook destinations should be {string}")]
fn webhook_destinations(world: &mut NutrimaticWorld, expected: String) {
    assert_eq!(loaded(world).webhooks.urls.join(","), expected);
}
