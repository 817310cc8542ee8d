//! Paths, query parameters and payloads of the endpoint groups.

use std::sync::Arc;

use httpmock::prelude::*;
use kg_http::HttpClientConfig;
use kg_sdk::{
    ClientBuilder, ExtendedResponseConfiguration, InstanceListOptions, KgAdminClient, KgClient,
    KgSettings, Pagination, QueryExecution, ResponseConfiguration, SpaceSpecification, Stage,
    TokenHandler, TypeOptions,
};
use serde_json::json;
use uuid::Uuid;

const NAMESPACE: &str = "https://kg.ebrains.eu/api/instances/";
const FIRST: &str = "0b1e2b3c-0000-4000-8000-000000000001";
const SECOND: &str = "0b1e2b3c-0000-4000-8000-000000000002";

fn builder(server: &MockServer) -> ClientBuilder {
    ClientBuilder::from_settings(KgSettings::default())
        .endpoint(format!("http://localhost:{}/v3-beta/", server.port()))
        .with_token_handler(Arc::new(TokenHandler::static_token("abc")))
        .http_config(HttpClientConfig::for_testing())
}

fn client(server: &MockServer) -> KgClient {
    builder(server).build().unwrap()
}

fn admin(server: &MockServer) -> KgAdminClient {
    builder(server).build_admin().unwrap()
}

fn uuid(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap()
}

#[tokio::test]
async fn list_instances_sends_filters() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v3-beta/instances")
            .query_param("stage", "IN_PROGRESS")
            .query_param("type", "https://openminds.ebrains.eu/core/Person")
            .query_param("space", "myspace")
            .query_param("searchByLabel", "Jane")
            .query_param("filterProperty", "https://schema.org/familyName")
            .query_param("filterValue", "Doe")
            .query_param("returnPayload", "false")
            .query_param("returnTotalResults", "true")
            .query_param("from", "20")
            .query_param("size", "10")
            .header("authorization", "Bearer abc");
        then.status(200)
            .json_body(json!({"data": [], "total": 0, "from": 20, "size": 0}));
    });

    let options = InstanceListOptions::of_type("https://openminds.ebrains.eu/core/Person")
        .stage(Stage::InProgress)
        .space("myspace")
        .search_by_label("Jane")
        .filter("https://schema.org/familyName", "Doe")
        .response(ResponseConfiguration {
            return_payload: Some(false),
            ..ResponseConfiguration::default()
        })
        .pagination(Pagination::new(20, 10));

    let page = client(&server).instances().list(&options).await.unwrap();

    mock.assert_calls(1);
    assert_eq!(page.total, Some(0));
    assert!(page.is_empty());
}

#[tokio::test]
async fn get_by_ids_keys_results_by_id() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v3-beta/instancesByIds")
            .query_param("stage", "RELEASED")
            .query_param("returnIncomingLinks", "true")
            .json_body(json!([FIRST, SECOND]));
        then.status(200).json_body(json!({
            "data": {
                FIRST: {"data": {"@id": format!("{NAMESPACE}{FIRST}")}},
                SECOND: {"error": {"code": 404, "message": "not found"}}
            },
            "durationInMs": 12
        }));
    });

    let config = ExtendedResponseConfiguration {
        return_incoming_links: Some(true),
        ..ExtendedResponseConfiguration::default()
    };
    let results = client(&server)
        .instances()
        .get_by_ids(&[uuid(FIRST), uuid(SECOND)], Stage::Released, config)
        .await
        .unwrap();

    mock.assert_calls(1);
    assert!(results.error.is_none());
    assert_eq!(results.meta.duration_in_ms, Some(12));

    let found = results.get(FIRST).unwrap();
    assert_eq!(found.data.as_ref().unwrap().uuid(), Some(uuid(FIRST)));

    let missing = results.get(SECOND).unwrap();
    assert!(missing.data.is_none());
    assert_eq!(missing.error.as_ref().unwrap().code, 404);
    assert!(results.get("unknown").is_none());
}

#[tokio::test]
async fn release_and_unrelease() {
    let server = MockServer::start();
    let release = server.mock(|when, then| {
        when.method(PUT)
            .path(format!("/v3-beta/instances/{FIRST}/release"))
            .query_param("revision", "rev-7");
        then.status(200);
    });
    let unrelease = server.mock(|when, then| {
        when.method(DELETE)
            .path(format!("/v3-beta/instances/{FIRST}/release"));
        then.status(403)
            .json_body(json!({"error": {"code": 403, "message": "no rights"}}));
    });

    let client = client(&server);
    let instances = client.instances();

    assert!(instances.release(uuid(FIRST), Some("rev-7")).await.unwrap().is_none());
    let err = instances.unrelease(uuid(FIRST)).await.unwrap().unwrap();
    assert_eq!(err.code, 403);
    assert_eq!(err.message.as_deref(), Some("no rights"));

    release.assert_calls(1);
    unrelease.assert_calls(1);
}

#[tokio::test]
async fn create_with_payload_and_space() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("/v3-beta/instances/{FIRST}"))
            .query_param("space", "myspace")
            .json_body(json!({"@type": ["https://openminds.ebrains.eu/core/Person"]}));
        then.status(201).json_body(json!({
            "data": {
                "@id": format!("{NAMESPACE}{FIRST}"),
                "@type": ["https://openminds.ebrains.eu/core/Person"]
            }
        }));
    });

    let created = client(&server)
        .instances()
        .create_new_with_id(
            json!({"@type": ["https://openminds.ebrains.eu/core/Person"]}),
            uuid(FIRST),
            "myspace",
            ExtendedResponseConfiguration::default(),
        )
        .await
        .unwrap();

    mock.assert_calls(1);
    let instance = created.data.unwrap();
    assert_eq!(instance.uuid(), Some(uuid(FIRST)));
    assert_eq!(instance.id(), Some(format!("{NAMESPACE}{FIRST}").as_str()));
}

#[tokio::test]
async fn execute_query_restricts_spaces() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path(format!("/v3-beta/queries/{FIRST}/instances"))
            .query_param("stage", "IN_PROGRESS")
            .query_param("instanceId", SECOND)
            .query_param("restrictToSpaces", "common")
            .query_param("restrictToSpaces", "myspace")
            .query_param("givenName", "Jane");
        then.status(200).json_body(json!({
            "data": [{"name": "Jane"}],
            "total": 1,
            "from": 0,
            "size": 1
        }));
    });

    let execution = QueryExecution::default()
        .stage(Stage::InProgress)
        .instance_id(uuid(SECOND))
        .restrict_to_space("common")
        .restrict_to_space("myspace")
        .param("givenName", "Jane");
    let page = client(&server)
        .queries()
        .execute_query_by_id(uuid(FIRST), &execution)
        .await
        .unwrap();

    mock.assert_calls(1);
    assert_eq!(page.items_slice()[0].get("name"), Some(&json!("Jane")));
}

#[tokio::test]
async fn types_by_name() {
    let server = MockServer::start();
    let person = "https://openminds.ebrains.eu/core/Person";
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v3-beta/typesByName")
            .query_param("stage", "RELEASED")
            .query_param("withProperties", "true")
            .query_param("withIncomingLinks", "false")
            .json_body(json!([person]));
        then.status(200).json_body(json!({
            "data": {
                person: {"data": {
                    "http://schema.org/identifier": person,
                    "http://schema.org/name": "Person",
                    "https://core.kg.ebrains.eu/vocab/meta/occurrences": 42
                }}
            }
        }));
    });

    let options = TypeOptions {
        with_properties: true,
        ..TypeOptions::default()
    };
    let types = client(&server)
        .types()
        .get_by_name(&[person], &options)
        .await
        .unwrap();

    mock.assert_calls(1);
    let info = types.get(person).unwrap().data.as_ref().unwrap();
    assert_eq!(info.name.as_deref(), Some("Person"));
    assert_eq!(info.occurrences, Some(42));
}

#[tokio::test]
async fn spaces_list_with_permissions() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v3-beta/spaces")
            .query_param("permissions", "true")
            .query_param("size", "50");
        then.status(200).json_body(json!({
            "data": [{
                "http://schema.org/identifier": "myspace",
                "http://schema.org/name": "myspace",
                "https://core.kg.ebrains.eu/vocab/meta/permissions": ["READ", "WRITE"]
            }],
            "total": 1
        }));
    });

    let spaces = client(&server)
        .spaces()
        .list(true, Pagination::default())
        .await
        .unwrap();

    mock.assert_calls(1);
    let space = &spaces.items_slice()[0];
    assert_eq!(space.identifier.as_deref(), Some("myspace"));
    assert_eq!(
        space.permissions.as_deref(),
        Some(&["READ".to_owned(), "WRITE".to_owned()][..])
    );
}

#[tokio::test]
async fn terms_of_use_is_a_bare_object() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v3-beta/users/termsOfUse");
        then.status(200)
            .json_body(json!({"version": "v1.1", "data": "Be nice.", "accepted": true}));
    });
    let accept = server.mock(|when, then| {
        when.method(POST)
            .path("/v3-beta/users/termsOfUse/v1.1/accept");
        then.status(200);
    });

    let client = client(&server);
    let terms = client.users().get_terms_of_use().await.unwrap().unwrap();
    assert_eq!(terms.version, "v1.1");
    assert!(terms.accepted);

    assert!(client.users().accept_terms_of_use(&terms.version).await.unwrap().is_none());
    accept.assert_calls(1);
}

#[tokio::test]
async fn terms_of_use_error_is_none() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v3-beta/users/termsOfUse");
        then.status(500);
    });

    assert!(client(&server).users().get_terms_of_use().await.unwrap().is_none());
}

#[tokio::test]
async fn normalize_payload_posts_document() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v3-beta/jsonld/normalizedPayload")
            .json_body(json!({"name": "Jane"}));
        then.status(200).json_body(json!({"data": {"http://schema.org/name": "Jane"}}));
    });

    let error = client(&server)
        .jsonld()
        .normalize_payload(json!({"name": "Jane"}))
        .await
        .unwrap();

    assert!(error.is_none());
    mock.assert_calls(1);
}

#[tokio::test]
async fn admin_space_definition() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(PUT)
            .path("/v3-beta/spaces/myspace/specification")
            .query_param("autorelease", "true")
            .query_param("clientSpace", "false")
            .query_param("deferCache", "false");
        then.status(200);
    });
    let remove = server.mock(|when, then| {
        when.method(DELETE)
            .path("/v3-beta/spaces/myspace/specification");
        then.status(200);
    });

    let admin = admin(&server);
    let spec = SpaceSpecification {
        autorelease: true,
        ..SpaceSpecification::default()
    };
    assert!(admin.create_space_definition("myspace", spec).await.unwrap().is_none());
    assert!(admin.remove_space_definition("myspace").await.unwrap().is_none());

    create.assert_calls(1);
    remove.assert_calls(1);
}

#[tokio::test]
async fn admin_lists_instances_with_invitations() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v3-beta/instancesWithInvitations");
        then.status(200)
            .json_body(json!({"data": [FIRST, format!("{NAMESPACE}{SECOND}")]}));
    });

    let ids = admin(&server)
        .list_instances_with_invitations()
        .await
        .unwrap()
        .into_result()
        .unwrap()
        .unwrap();

    assert_eq!(ids, vec![uuid(FIRST), uuid(SECOND)]);
}

#[tokio::test]
async fn admin_trigger_inference() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v3-beta/spaces/myspace/inference")
            .query_param("identifier", "https://doi.org/10.1/abc")
            .query_param("async", "true");
        then.status(200);
    });

    let error = admin(&server)
        .trigger_inference("myspace", Some("https://doi.org/10.1/abc"), true)
        .await
        .unwrap();

    assert!(error.is_none());
    mock.assert_calls(1);
}
