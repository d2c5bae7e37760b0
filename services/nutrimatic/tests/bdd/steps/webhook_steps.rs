//! BDD step definitions for prescription review and webhook delivery

use std::time::Duration;

use cucumber::{given, then};

use nutrimatic::webhook::DeliveryRecord;

use crate::world::{NutrimaticWorld, PRESCRIPTION_ID, USER_ID};

#[given(expr = "a pending prescription for {string}")]
fn pending_prescription(world: &mut NutrimaticWorld, client_name: String) {
    world.http.route(
        "/rest/v1/prescricoes",
        200,
        &serde_json::json!([{
            "id": PRESCRIPTION_ID,
            "nutricionista_id": USER_ID,
            "nome_cliente": client_name,
            "status": "Pending",
            "payload": {},
            "pdf_url": "https://files.example/carla.pdf"
        }])
        .to_string(),
    );
}

#[given(expr = "webhook destinations {string} and {string}")]
fn webhook_destinations(world: &mut NutrimaticWorld, first: String, second: String) {
    world.webhook_urls = vec![first, second];
}

#[given("no webhook destinations")]
fn no_destinations(world: &mut NutrimaticWorld) {
    world.webhook_urls.clear();
}

#[given(expr = "the destination {string} is unreachable")]
fn unreachable_destination(world: &mut NutrimaticWorld, url: String) {
    world.http.make_unreachable(&url);
}

async fn wait_for_deliveries(world: &NutrimaticWorld, expected: usize) -> Vec<DeliveryRecord> {
    let log = world.deliveries.as_ref().expect("no request sent");
    for _ in 0..200 {
        {
            let log = log.read().await;
            if log.records.len() >= expected {
                return log.records.iter().cloned().collect();
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    log.read().await.records.iter().cloned().collect()
}

#[then(expr = "{int} webhook deliveries should be recorded")]
async fn deliveries_recorded(world: &mut NutrimaticWorld, expected: usize) {
    let records = wait_for_deliveries(world, expected).await;
    assert_eq!(records.len(), expected, "{:?}", records);
}

#[then("every delivery should succeed")]
async fn every_delivery_succeeds(world: &mut NutrimaticWorld) {
    let records = wait_for_deliveries(world, world.webhook_urls.len()).await;
    assert!(records.iter().all(|r| r.success), "{:?}", records);
}

#[then(expr = "the delivery to {string} should succeed")]
async fn delivery_succeeds(world: &mut NutrimaticWorld, url: String) {
    let records = wait_for_deliveries(world, world.webhook_urls.len()).await;
    let record = records
        .iter()
        .find(|r| r.url == url)
        .expect("no delivery for url");
    assert!(record.success);
    assert_eq!(record.status, Some(200));
}

#[then(expr = "the delivery to {string} should fail")]
async fn delivery_fails(world: &mut NutrimaticWorld, url: String) {
    let records = wait_for_deliveries(world, world.webhook_urls.len()).await;
    let record = records
        .iter()
        .find(|r| r.url == url)
        .expect("no delivery for url");
    assert!(!record.success);
    assert!(record.error.is_some());
}

#[then(expr = "every destination should receive status {string} for {string}")]
async fn destinations_receive_payload(world: &mut NutrimaticWorld, status: String, client: String) {
    wait_for_deliveries(world, world.webhook_urls.len()).await;
    let calls = world.http.calls();
    for url in &world.webhook_urls {
        let call = calls
            .iter()
            .find(|c| c.method == "POST" && &c.url == url)
            .unwrap_or_else(|| panic!("no POST to {}", url));
        let body = call.body.as_ref().expect("no body");
        assert_eq!(body["status"], status.as_str());
        assert_eq!(body["client_name"], client.as_str());
        assert_eq!(body["previous_status"], "Pending");
    }
}

#[then(expr = "the backend should receive a status update to {string}")]
fn backend_status_update(world: &mut NutrimaticWorld, status: String) {
    let calls = world.http.calls();
    let patch = calls
        .iter()
        .find(|c| c.method == "PATCH" && c.url.contains("/rest/v1/prescricoes"))
        .expect("no status update");
    assert_eq!(
        patch.body.as_ref().expect("no body")["status"],
        status.as_str()
    );
}

#[then(expr = "the profile counter should be updated to {int}")]
fn profile_counter_updated(world: &mut NutrimaticWorld, expected: u32) {
    let calls = world.http.calls();
    let patch = calls
        .iter()
        .find(|c| c.method == "PATCH" && c.url.contains("/rest/v1/nutricionistas"))
        .expect("no counter update");
    assert_eq!(
        patch.body.as_ref().expect("no body")["prescricoes_geradas"],
        expected
    );
}
