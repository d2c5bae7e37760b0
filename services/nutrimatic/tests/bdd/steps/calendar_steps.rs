//! BDD step definitions for calendar event mapping

use cucumber::{given, then, when};

use nutrimatic::model::{CalendarEvent, EventColor, EventRow};

use crate::world::NutrimaticWorld;

fn parse_color(s: &str) -> EventColor {
    match s {
        "blue" => EventColor::Blue,
        "green" => EventColor::Green,
        "purple" => EventColor::Purple,
        "orange" => EventColor::Orange,
        "red" => EventColor::Red,
        "gray" => EventColor::Gray,
        other => panic!("Unknown color: {}", other),
    }
}

fn event_row(action: &str, time: Option<&str>, client: Option<&str>) -> EventRow {
    let row = serde_json::json!({
        "id": "00000000-0000-0000-0000-000000000010",
        "data": "2025-03-10",
        "hora": time,
        "acao": action,
        "clientes": client.map(|name| serde_json::json!({ "nome": name })),
    });
    serde_json::from_value(row).expect("valid event row")
}

#[when(expr = "an event {string} at {string} for client {string} is mapped")]
fn map_event_with_client(
    world: &mut NutrimaticWorld,
    action: String,
    time: String,
    client: String,
) {
    let row = event_row(&action, Some(time.as_str()), Some(client.as_str()));
    world.calendar_event = Some(CalendarEvent::from(row));
}

#[when(expr = "an event {string} without time or client is mapped")]
fn map_bare_event(world: &mut NutrimaticWorld, action: String) {
    world.calendar_event = Some(CalendarEvent::from(event_row(&action, None, None)));
}

#[then(expr = "the event title should be {string}")]
fn event_title(world: &mut NutrimaticWorld, expected: String) {
    let event = world.calendar_event.as_ref().expect("no event mapped");
    assert_eq!(event.title, expected);
}

#[then(expr = "the event time should be {string}")]
fn event_time(world: &mut NutrimaticWorld, expected: String) {
    let event = world.calendar_event.as_ref().expect("no event mapped");
    assert_eq!(event.time.as_deref(), Some(expected.as_str()));
}

#[then("the event should have no time")]
fn event_without_time(world: &mut NutrimaticWorld) {
    let event = world.calendar_event.as_ref().expect("no event mapped");
    assert!(event.time.is_none());
}

#[then(expr = "the event color should be {word}")]
fn event_color(world: &mut NutrimaticWorld, color: String) {
    let event = world.calendar_event.as_ref().expect("no event mapped");
    assert_eq!(event.color, parse_color(&color));
}

#[given(expr = "the backend has an event {string} on {string} at {string}")]
fn backend_event(world: &mut NutrimaticWorld, action: String, date: String, time: String) {
    world.http.route(
        "/rest/v1/agenda_eventos",
        200,
        &serde_json::json!([{
            "id": "00000000-0000-0000-0000-000000000011",
            "data": date,
            "hora": time,
            "acao": action,
            "clientes": { "nome": "Carla" }
        }])
        .to_string(),
    );
}

#[given("the backend fails to list events")]
fn backend_event_failure(world: &mut NutrimaticWorld) {
    world
        .http
        .route("/rest/v1/agenda_eventos", 500, r#"{"message":"boom"}"#);
}
