//! BDD step definitions for the dashboard access gate

use cucumber::given;

use crate::world::{NutrimaticWorld, USER_ID};

fn profile_json(active: bool, generated: u32, limit: u32) -> String {
    serde_json::json!([{
        "id": USER_ID,
        "nome": "Ana",
        "email": "ana@example.com",
        "ativo": active,
        "prescricoes_geradas": generated,
        "limite_prescricoes": limit
    }])
    .to_string()
}

#[given("a configured backend")]
fn configured_backend(world: &mut NutrimaticWorld) {
    world.backend_configured = true;
}

#[given("an unconfigured backend")]
fn unconfigured_backend(world: &mut NutrimaticWorld) {
    world.backend_configured = false;
}

fn sign_in(world: &mut NutrimaticWorld) {
    world.access_token = Some("session-token".to_string());
    world.http.route(
        "/auth/v1/user",
        200,
        &serde_json::json!({ "id": USER_ID, "email": "ana@example.com" }).to_string(),
    );
}

#[given("a signed-in user")]
fn signed_in_user(world: &mut NutrimaticWorld) {
    sign_in(world);
}

#[given("a signed-in user whose profile is active")]
fn signed_in_active(world: &mut NutrimaticWorld) {
    sign_in(world);
    world
        .http
        .route("/rest/v1/nutricionistas", 200, &profile_json(true, 3, 10));
}

#[given("a signed-in user whose profile is inactive")]
fn signed_in_inactive(world: &mut NutrimaticWorld) {
    sign_in(world);
    world
        .http
        .route("/rest/v1/nutricionistas", 200, &profile_json(false, 0, 10));
}

#[given(expr = "a signed-in user who has used {int} of {int} prescriptions")]
fn signed_in_with_usage(world: &mut NutrimaticWorld, generated: u32, limit: u32) {
    sign_in(world);
    world.http.route(
        "/rest/v1/nutricionistas",
        200,
        &profile_json(true, generated, limit),
    );
}

#[given("a visitor whose token the backend rejects")]
fn rejected_token(world: &mut NutrimaticWorld) {
    world.access_token = Some("expired-token".to_string());
    world
        .http
        .route("/auth/v1/user", 401, r#"{"msg":"expired"}"#);
}
