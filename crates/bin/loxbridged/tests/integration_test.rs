//! End-to-end tests for the loxbridge stack.
//!
//! Each test serves a structure document from a mock Miniserver, fetches it
//! with the real HTTP client, parses it, and drives a real gateway. The
//! broker side is an in-memory channel: no MQTT connection is made.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use loxbridge_adapter_miniserver::MiniserverClient;
use loxbridge_app::config::{AdaptorConfig, GatewayConfig, Granularity};
use loxbridge_app::gateway::Gateway;
use loxbridge_app::ports::Publication;
use loxbridge_domain::structure::Structure;
use loxbridge_domain::value::StateValue;

type TestGateway = Gateway<mpsc::UnboundedSender<Publication>, MiniserverClient>;

fn structure_document() -> Value {
    json!({
        "msInfo": { "serialNr": "504F94A00000", "msName": "Home" },
        "globalStates": { "sunrise": "g-sunrise" },
        "rooms": {
            "r1": { "uuid": "r1", "name": "Kitchen", "image": "kitchen.svg" }
        },
        "cats": {
            "k1": { "uuid": "k1", "name": "Lights", "image": "lights.svg" }
        },
        "controls": {
            "c-lamp": {
                "name": "Lamp",
                "type": "Switch",
                "uuidAction": "c-lamp",
                "room": "r1",
                "cat": "k1",
                "states": { "active": "s-lamp" }
            },
            "c-bell": {
                "name": "Bell",
                "type": "Pushbutton",
                "uuidAction": "c-bell",
                "states": { "active": "s-bell" }
            },
            "c-meter": {
                "name": "Meter",
                "type": "InfoOnlyAnalog",
                "uuidAction": "c-meter",
                "states": { "value": "s-meter" },
                "subControls": {
                    "c-meter/total": {
                        "name": "Total",
                        "type": "InfoOnlyAnalog",
                        "uuidAction": "c-meter/total",
                        "states": { "value": "s-total" }
                    }
                }
            }
        }
    })
}

async fn miniserver() -> (MockServer, MiniserverClient) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/LoxAPP3.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(structure_document()))
        .mount(&server)
        .await;
    let client = MiniserverClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        "admin".to_string(),
        None,
    );
    (server, client)
}

async fn gateway(
    client: &MiniserverClient,
    config: GatewayConfig,
    adaptor: AdaptorConfig,
) -> (TestGateway, mpsc::UnboundedReceiver<Publication>) {
    let document = client.fetch_structure().await.unwrap();
    let mut invalid = Vec::new();
    let structure = Structure::from_json(&document, |field| invalid.push(field)).unwrap();
    assert!(invalid.is_empty(), "unexpected invalid fields: {invalid:?}");

    let (tx, rx) = mpsc::unbounded_channel();
    let mut gateway = Gateway::new(config, adaptor, tx, client.clone());
    gateway.load_structure(structure.into_shared());
    (gateway, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Publication>) -> Vec<Publication> {
    let mut publications = Vec::new();
    while let Ok(publication) = rx.try_recv() {
        publications.push(publication);
    }
    publications
}

async fn wait_for_requests(server: &MockServer, count: usize) {
    for _ in 0..50 {
        if server.received_requests().await.unwrap().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn should_publish_retained_catalog_after_load() {
    let (_server, client) = miniserver().await;
    let (gateway, mut rx) =
        gateway(&client, GatewayConfig::default(), AdaptorConfig::default()).await;

    let publications = drain(&mut rx);
    assert_eq!(publications.len(), 1);
    let catalog = &publications[0];
    assert_eq!(catalog.topic, "lox/structure");
    assert!(catalog.retain);

    let document: Value = serde_json::from_str(&catalog.payload).unwrap();
    let names: Vec<_> = document["controls"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bell", "Lamp", "Meter"]);
    assert_eq!(
        document["controls"][1]["states"]["active"],
        "lox/504F94A00000/c-lamp/states/active"
    );
    assert_eq!(
        document["controls"][2]["sub_controls"][0]["command_topic"],
        "lox/504F94A00000/c-meter/total/cmd"
    );
    assert_eq!(
        gateway.subscriptions(),
        vec!["lox/+/+/cmd", "lox/+/+/+/cmd"]
    );
}

#[tokio::test]
async fn should_publish_device_values_on_state_topics() {
    let (_server, client) = miniserver().await;
    let (gateway, mut rx) = gateway(
        &client,
        GatewayConfig {
            publish_structure: false,
            ..GatewayConfig::default()
        },
        AdaptorConfig::default(),
    )
    .await;

    gateway.handle_device_update("s-lamp", StateValue::Number(1.0));
    gateway.handle_device_update("s-bell", StateValue::Number(1.0));
    gateway.handle_device_update("s-total", StateValue::Number(42.5));
    gateway.handle_device_update("g-sunrise", StateValue::Number(360.0));
    gateway.handle_device_update("unrouted", StateValue::Number(0.0));

    let publications: Vec<_> = drain(&mut rx)
        .into_iter()
        .map(|p| (p.topic, p.payload, p.retain))
        .collect();
    assert_eq!(
        publications,
        vec![
            (
                "lox/504F94A00000/c-lamp/states/active".to_string(),
                "1".to_string(),
                true
            ),
            (
                "lox/504F94A00000/c-bell/states/active".to_string(),
                "1".to_string(),
                false
            ),
            (
                "lox/504F94A00000/c-meter/total/states/value".to_string(),
                "42.5".to_string(),
                true
            ),
            ("globalstates/sunrise".to_string(), "360".to_string(), true),
        ]
    );
}

#[tokio::test]
async fn should_group_states_per_device() {
    let (_server, client) = miniserver().await;
    let (gateway, mut rx) = gateway(
        &client,
        GatewayConfig {
            publish_structure: false,
            ..GatewayConfig::default()
        },
        AdaptorConfig {
            granularity: Granularity::PerDevice,
            ..AdaptorConfig::default()
        },
    )
    .await;

    gateway.handle_device_update("s-meter", StateValue::Number(7.0));

    let publication = rx.try_recv().unwrap();
    assert_eq!(publication.topic, "lox/504F94A00000/c-meter/state");
    let payload: Value = serde_json::from_str(&publication.payload).unwrap();
    assert_eq!(payload, json!({ "value": 7.0 }));
}

#[tokio::test]
async fn should_forward_bus_command_to_miniserver() {
    let (server, client) = miniserver().await;
    Mock::given(method("GET"))
        .and(path("/jdev/sps/io/c-meter/total/reset"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "LL": { "Code": "200" } })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (gateway, _rx) =
        gateway(&client, GatewayConfig::default(), AdaptorConfig::default()).await;

    gateway.handle_bus_message("lox/504F94A00000/c-meter/total/cmd", b"reset");

    wait_for_requests(&server, 2).await;
    server.verify().await;
}

#[tokio::test]
async fn should_not_contact_miniserver_in_readonly_mode() {
    let (server, client) = miniserver().await;
    let (gateway, _rx) = gateway(
        &client,
        GatewayConfig {
            readonly: true,
            ..GatewayConfig::default()
        },
        AdaptorConfig::default(),
    )
    .await;

    gateway.handle_bus_message("lox/504F94A00000/c-lamp/cmd", b"on");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "only the structure fetch is expected");
}
