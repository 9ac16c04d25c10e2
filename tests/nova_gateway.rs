//! Request-level tests for the Keystone and Nova gateway against a stub
//! HTTP server.

use nova_machine::config::DEFAULT_SSH_PORT;
use nova_machine::{
    CloudServerGateway, NovaGateway, NovaGatewayError, OpenStackConfig, RebootMode,
};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "tok-123";
const COMPUTE_PREFIX: &str = "/compute/v2.1";

fn config_for(server: &MockServer, region: Option<&str>) -> OpenStackConfig {
    OpenStackConfig {
        username: String::from("demo"),
        api_key: String::from("s3cret"),
        auth_url: server.uri(),
        tenant: String::from("demo-project"),
        domain: String::from("Default"),
        region: region.map(str::to_owned),
        network: None,
        address_id: None,
        floating_ip: None,
        nfs_host_ip: None,
        ssh_port: DEFAULT_SSH_PORT,
        log_filter: String::from("info"),
        log_format: String::from("compact"),
    }
}

fn gateway_for(server: &MockServer) -> NovaGateway {
    NovaGateway::new(&config_for(server, Some("RegionOne")))
        .unwrap_or_else(|err| panic!("gateway should build: {err}"))
}

fn catalog(server: &MockServer) -> Value {
    json!({
        "token": {
            "catalog": [{
                "type": "compute",
                "endpoints": [{
                    "interface": "public",
                    "region": "RegionOne",
                    "url": format!("{}{COMPUTE_PREFIX}", server.uri()),
                }]
            }]
        }
    })
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .and(body_partial_json(json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": { "user": { "name": "demo", "password": "s3cret" } }
                },
                "scope": { "project": { "name": "demo-project" } }
            }
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("X-Subject-Token", TOKEN)
                .set_body_json(catalog(server)),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn compute(suffix: &str) -> String {
    format!("{COMPUTE_PREFIX}{suffix}")
}

fn web_server_body() -> Value {
    json!({
        "id": "srv-web",
        "name": "web",
        "addresses": {
            "private-net": [
                { "addr": "10.0.0.5", "version": 4, "OS-EXT-IPS:type": "fixed" },
                { "addr": "198.51.100.5", "version": 4, "OS-EXT-IPS:type": "floating" }
            ]
        }
    })
}

#[tokio::test]
async fn get_server_decodes_and_classifies_addresses() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(compute("/servers/srv-web")))
        .and(header("X-Auth-Token", TOKEN))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "server": web_server_body() })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let record = gateway_for(&server)
        .get_server("srv-web")
        .await
        .unwrap_or_else(|err| panic!("get should succeed: {err}"))
        .unwrap_or_else(|| panic!("server should be found"));

    assert_eq!(record.id, "srv-web");
    assert_eq!(record.name, "web");
    assert_eq!(record.public_addresses, vec![String::from("198.51.100.5")]);
    assert_eq!(record.private_addresses, vec![String::from("10.0.0.5")]);
}

#[tokio::test]
async fn get_server_maps_not_found_to_none() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(compute("/servers/srv-gone")))
        .respond_with(ResponseTemplate::new(404).set_body_string("itemNotFound"))
        .expect(1)
        .mount(&server)
        .await;

    let found = gateway_for(&server).get_server("srv-gone").await;

    assert_eq!(found, Ok(None));
}

#[tokio::test]
async fn list_servers_preserves_listing_order() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(compute("/servers/detail")))
        .and(header("X-Auth-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "servers": [web_server_body(), { "id": "srv-db", "name": "db", "addresses": {} }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let listed = gateway_for(&server)
        .list_servers()
        .await
        .unwrap_or_else(|err| panic!("list should succeed: {err}"));

    let ids: Vec<&str> = listed.iter().map(|record| record.id.as_str()).collect();
    assert_eq!(ids, vec!["srv-web", "srv-db"]);
}

#[tokio::test]
async fn destroy_server_sends_delete() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("DELETE"))
        .and(path(compute("/servers/srv-web")))
        .and(header("X-Auth-Token", TOKEN))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = gateway_for(&server).destroy_server("srv-web").await;

    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn reboot_server_posts_the_reboot_type() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("POST"))
        .and(path(compute("/servers/srv-web/action")))
        .and(header("X-Auth-Token", TOKEN))
        .and(body_json(json!({ "reboot": { "type": "SOFT" } })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let result = gateway_for(&server)
        .reboot_server("srv-web", RebootMode::Soft)
        .await;

    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn unexpected_status_reports_method_and_body() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(compute("/servers/detail")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let Err(err) = gateway_for(&server).list_servers().await else {
        panic!("a 500 must fail the listing");
    };

    assert!(
        matches!(
            &err,
            NovaGatewayError::Status { method: verb, status: 500, body, .. }
                if verb == "GET" && body == "boom"
        ),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn session_is_authenticated_once_and_shared_by_clones() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(compute("/servers/detail")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "servers": [] })))
        .expect(2)
        .mount(&server)
        .await;
    let gateway = gateway_for(&server);
    let clone = gateway.clone();

    let first = gateway.list_servers().await;
    let second = clone.list_servers().await;

    assert_eq!(first, Ok(Vec::new()));
    assert_eq!(second, Ok(Vec::new()));
    server.verify().await;
}

#[tokio::test]
async fn rejected_credentials_surface_as_auth_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = gateway_for(&server).get_server("srv-web").await;

    assert_eq!(
        result,
        Err(NovaGatewayError::Auth {
            status: 401,
            message: String::from("bad credentials"),
        })
    );
}

#[tokio::test]
async fn token_response_without_subject_header_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(catalog(&server)))
        .mount(&server)
        .await;

    let result = gateway_for(&server).list_servers().await;

    assert_eq!(result, Err(NovaGatewayError::MissingToken));
}

#[tokio::test]
async fn catalogue_without_the_region_is_rejected() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    let gateway = NovaGateway::new(&config_for(&server, Some("RegionTwo")))
        .unwrap_or_else(|err| panic!("gateway should build: {err}"));

    let result = gateway.list_servers().await;

    assert_eq!(
        result,
        Err(NovaGatewayError::MissingEndpoint {
            region: Some(String::from("RegionTwo")),
        })
    );
}
