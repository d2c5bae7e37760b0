//! Shared request and response steps

use cucumber::{then, when};

use crate::world::NutrimaticWorld;

#[when(expr = "I request {string}")]
async fn request_get(world: &mut NutrimaticWorld, uri: String) {
    world.send("GET", &uri, None).await;
}

#[when(expr = "I post to {string}")]
async fn request_post(world: &mut NutrimaticWorld, uri: String) {
    world.send("POST", &uri, None).await;
}

#[when(expr = "I post to {string} with body {string}")]
async fn request_post_json(world: &mut NutrimaticWorld, uri: String, body: String) {
    world.send("POST", &uri, Some(body.as_str())).await;
}

#[then(expr = "the response status should be {int}")]
fn response_status(world: &mut NutrimaticWorld, expected: u16) {
    assert_eq!(
        world.response_status,
        Some(expected),
        "body: {:?}",
        world.response_body
    );
}

#[then(expr = "the response should redirect to {string}")]
fn response_redirects(world: &mut NutrimaticWorld, location: String) {
    assert_eq!(world.response_status, Some(303));
    let headers = world.response_headers.as_ref().expect("no response");
    assert_eq!(headers["location"], location.as_str());
    assert_eq!(world.response_body.as_deref(), Some(""));
}

#[then(expr = "the response should contain {string}")]
fn response_contains(world: &mut NutrimaticWorld, expected: String) {
    let body = world.response_body.as_ref().expect("no response body");
    assert!(
        body.contains(&expected),
        "Expected response to contain '{}', but it didn't.\nResponse body:\n{}",
        expected,
        body
    );
}

#[then(expr = "the response header {string} should be {string}")]
fn response_header(world: &mut NutrimaticWorld, name: String, value: String) {
    let headers = world.response_headers.as_ref().expect("no response");
    assert_eq!(
        headers.get(name.as_str()).and_then(|v| v.to_str().ok()),
        Some(value.as_str())
    );
}

#[then(expr = "the response should not have header {string}")]
fn response_lacks_header(world: &mut NutrimaticWorld, name: String) {
    let headers = world.response_headers.as_ref().expect("no response");
    assert!(headers.get(name.as_str()).is_none(), "{} present", name);
}
