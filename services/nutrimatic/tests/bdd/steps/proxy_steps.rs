//! BDD step definitions for the file proxy

use cucumber::given;

use crate::world::NutrimaticWorld;

#[given(expr = "the remote file {string} serves {string} with header {string} set to {string}")]
fn remote_file_with_header(
    world: &mut NutrimaticWorld,
    url: String,
    body: String,
    header: String,
    value: String,
) {
    world.http.route_with_headers(
        &url,
        200,
        vec![
            ("Content-Type".to_string(), "application/pdf".to_string()),
            (header, value),
        ],
        &body,
    );
}

#[given(expr = "the remote file {string} answers {int} with {string}")]
fn remote_file_status(world: &mut NutrimaticWorld, url: String, status: u16, body: String) {
    world.http.route(&url, status, &body);
}

#[given(expr = "the remote host {string} is unreachable")]
fn remote_unreachable(world: &mut NutrimaticWorld, host: String) {
    world.http.make_unreachable(&host);
}
