//! End-to-end tests driving the HTTP router against a temporary media tree.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::*;
use opencds::didl::from_didl;
use opencds::model::MediaObject;
use opencds::state::AppState;

async fn browse(
    temp_dir: &tempfile::TempDir,
    object_id: &str,
    flag: &str,
    start: &str,
    count: &str,
) -> (StatusCode, String) {
    control(
        router(temp_dir),
        "/control/ContentDirectory",
        CDS,
        "Browse",
        &[
            ("ObjectID", object_id),
            ("BrowseFlag", flag),
            ("Filter", "*"),
            ("StartingIndex", start),
            ("RequestedCount", count),
            ("SortCriteria", ""),
        ],
    )
    .await
}

async fn browse_state(state: AppState, object_id: &str) -> (StatusCode, String) {
    control(
        opencds::web::create_router(state),
        "/control/ContentDirectory",
        CDS,
        "Browse",
        &[
            ("ObjectID", object_id),
            ("BrowseFlag", "BrowseDirectChildren"),
            ("Filter", "*"),
            ("StartingIndex", "0"),
            ("RequestedCount", "0"),
            ("SortCriteria", ""),
        ],
    )
    .await
}

fn objects(body: &str) -> Vec<MediaObject> {
    let didl = element_text(body, "Result").expect("Result element");
    from_didl(&didl).unwrap()
}

#[tokio::test]
async fn test_browse_root_children() {
    let temp_dir = media_tree();
    let (status, body) = browse(&temp_dir, "0", "BrowseDirectChildren", "0", "0").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(element_text(&body, "TotalMatches").as_deref(), Some("3"));
    assert_eq!(element_text(&body, "NumberReturned").as_deref(), Some("3"));
    assert_eq!(element_text(&body, "UpdateID").as_deref(), Some("0"));

    let objects = objects(&body);
    assert_eq!(objects.len(), 3);

    let song = objects
        .iter()
        .find(|o| o.base().object_id == "0/a.mp3")
        .expect("a.mp3 listed");
    assert!(!song.is_container());
    assert_eq!(song.base().title, "Tagged Title");
    assert_eq!(song.base().parent_id, "0");
    assert_eq!(song.base().object_class, "object.item.audioItem.musicTrack");
    assert_eq!(
        song.base().resources[0].uri,
        "http://192.168.1.20:8200/content?path=a.mp3"
    );
    assert_eq!(song.base().resources[0].protocol_info.content_type(), "audio/mpeg");

    let text = objects
        .iter()
        .find(|o| o.base().object_id == "0/b.txt")
        .expect("b.txt listed");
    assert_eq!(text.base().title, "b");
    assert_eq!(
        text.base().resources[0].protocol_info.content_type(),
        "application/octet-stream"
    );

    let sub = objects
        .iter()
        .find(|o| o.base().object_id == "0/Sub")
        .expect("Sub listed");
    assert!(sub.is_container());
    assert_eq!(sub.base().title, "Sub");
}

#[tokio::test]
async fn test_browse_metadata_item() {
    let temp_dir = media_tree();
    let (status, body) = browse(&temp_dir, "0/a.mp3", "BrowseMetadata", "0", "0").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(element_text(&body, "NumberReturned").as_deref(), Some("1"));
    assert_eq!(element_text(&body, "TotalMatches").as_deref(), Some("1"));

    let objects = objects(&body);
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].base().parent_id, "0");
    assert!(!objects[0].is_container());
}

#[tokio::test]
async fn test_browse_faults() {
    let temp_dir = media_tree();

    let (status, body) = browse(&temp_dir, "0/missing.mp3", "BrowseMetadata", "0", "0").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(element_text(&body, "errorCode").as_deref(), Some("701"));
    assert!(element_text(&body, "Result").is_none());

    let (_, body) = browse(&temp_dir, "0/b.txt", "BrowseDirectChildren", "0", "0").await;
    assert_eq!(element_text(&body, "errorCode").as_deref(), Some("710"));

    let (_, body) = browse(&temp_dir, "0/../../etc", "BrowseDirectChildren", "0", "0").await;
    assert_eq!(element_text(&body, "errorCode").as_deref(), Some("710"));

    let (_, body) = browse(&temp_dir, "0", "BrowseSideways", "0", "0").await;
    assert_eq!(element_text(&body, "errorCode").as_deref(), Some("402"));

    let (_, body) = browse(&temp_dir, "0", "BrowseDirectChildren", "zero", "0").await;
    assert_eq!(element_text(&body, "errorCode").as_deref(), Some("402"));

    let (_, body) = control(
        router(&temp_dir),
        "/control/ContentDirectory",
        CDS,
        "DestroyObject",
        &[("ObjectID", "0/a.mp3")],
    )
    .await;
    assert_eq!(element_text(&body, "errorCode").as_deref(), Some("401"));
}

#[tokio::test]
async fn test_search_and_capabilities() {
    let temp_dir = media_tree();

    let (status, body) = control(
        router(&temp_dir),
        "/control/ContentDirectory",
        CDS,
        "Search",
        &[
            ("ContainerID", "0"),
            ("SearchCriteria", r#"upnp:class derivedfrom "object.item.audioItem""#),
            ("Filter", "*"),
            ("StartingIndex", "0"),
            ("RequestedCount", "0"),
            ("SortCriteria", ""),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let found = objects(&body);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].base().object_id, "0/a.mp3");

    let (_, body) = control(router(&temp_dir), "/control/ContentDirectory", CDS, "GetSearchCapabilities", &[]).await;
    assert_eq!(element_text(&body, "SearchCaps").as_deref(), Some("upnp:class"));

    let (_, body) = control(router(&temp_dir), "/control/ContentDirectory", CDS, "GetSortCapabilities", &[]).await;
    assert!(element_text(&body, "SortCaps").unwrap().contains("dc:title"));

    let (_, body) = control(router(&temp_dir), "/control/ContentDirectory", CDS, "GetSystemUpdateID", &[]).await;
    assert_eq!(element_text(&body, "Id").as_deref(), Some("0"));
}

#[tokio::test]
async fn test_update_id_follows_generation() {
    let temp_dir = media_tree();
    let state = app_state(&temp_dir);
    state.generation.bump();
    state.generation.bump();

    let (_, body) = control(
        opencds::web::create_router(state),
        "/control/ContentDirectory",
        CDS,
        "GetSystemUpdateID",
        &[],
    )
    .await;
    assert_eq!(element_text(&body, "Id").as_deref(), Some("2"));
}

#[tokio::test]
async fn test_connection_manager_and_registrar() {
    let temp_dir = media_tree();

    let (status, body) = control(
        router(&temp_dir),
        "/control/ConnectionManager",
        "urn:schemas-upnp-org:service:ConnectionManager:1",
        "GetProtocolInfo",
        &[],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(element_text(&body, "Source").unwrap().contains("http-get:*:audio/mpeg:DLNA.ORG_PN=MP3"));

    let (status, body) = control(
        router(&temp_dir),
        "/control/X_MS_MediaReceiverRegistrar",
        "urn:microsoft.com:service:X_MS_MediaReceiverRegistrar:1",
        "IsAuthorized",
        &[("DeviceID", "")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(element_text(&body, "Result").as_deref(), Some("1"));
}

#[tokio::test]
async fn test_device_description_and_scpds() {
    let temp_dir = media_tree();
    for path in [
        "/description.xml",
        "/ContentDirectory.xml",
        "/ConnectionManager.xml",
        "/X_MS_MediaReceiverRegistrar.xml",
    ] {
        let request = Request::get(path).body(Body::empty()).unwrap();
        let (status, headers, body) = send(router(&temp_dir), request).await;
        assert_eq!(status, StatusCode::OK, "{}", path);
        assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/xml"));
        assert!(!body.is_empty());
    }
}

#[tokio::test]
async fn test_content_served_with_ranges() {
    let temp_dir = media_tree();

    let request = Request::get("/content?path=b.txt").body(Body::empty()).unwrap();
    let (status, headers, body) = send(router(&temp_dir), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(body, b"plain text");

    let request = Request::get("/content?path=b.txt")
        .header(header::RANGE, "bytes=6-")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(router(&temp_dir), request).await;
    assert_eq!(status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(headers[header::CONTENT_RANGE], "bytes 6-9/10");
    assert_eq!(body, b"text");

    let request = Request::head("/content?path=a.mp3").body(Body::empty()).unwrap();
    let (status, headers, body) = send(router(&temp_dir), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_listing_fresh_without_watcher() {
    let temp_dir = media_tree();
    let state = app_state_with(&temp_dir, |config| config.media.watch_for_changes = false);

    let (_, body) = browse_state(state.clone(), "0").await;
    assert_eq!(element_text(&body, "TotalMatches").as_deref(), Some("3"));

    std::fs::write(temp_dir.path().join("c.txt"), b"new").unwrap();
    std::fs::remove_file(temp_dir.path().join("b.txt")).unwrap();

    let (_, body) = browse_state(state.clone(), "0").await;
    let ids: Vec<String> = objects(&body)
        .iter()
        .map(|o| o.base().object_id.clone())
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&"0/c.txt".to_string()));
    assert!(!ids.contains(&"0/b.txt".to_string()));
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn test_album_art_listed_and_served() {
    let temp_dir = media_tree();
    let image = b"\x89PNG\r\n\x1a\nfront cover";
    std::fs::write(
        temp_dir.path().join("Sub/c.mp3"),
        mp3_with_cover("Covered", "The Band", "image/png", image),
    )
    .unwrap();

    let (_, body) = browse(&temp_dir, "0/Sub/c.mp3", "BrowseMetadata", "0", "0").await;
    let didl = element_text(&body, "Result").expect("Result element");
    assert!(didl.contains(r#"<upnp:albumArtURI dlna:profileID="PNG_TN">"#), "{}", didl);

    let song = &objects(&body)[0];
    let art_uri = song.base().extra_info.album_art_uri.clone().expect("albumArtURI");
    assert_eq!(art_uri, "http://192.168.1.20:8200/albumart?path=Sub%2Fc.mp3");
    assert_eq!(song.base().extra_info.album_art_profile.as_deref(), Some("PNG_TN"));

    let request = Request::get("/albumart?path=Sub%2Fc.mp3").body(Body::empty()).unwrap();
    let (status, headers, body) = send(router(&temp_dir), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(body, image.to_vec());
}

#[tokio::test]
async fn test_content_errors() {
    let temp_dir = media_tree();

    let request = Request::delete("/content?path=b.txt").body(Body::empty()).unwrap();
    let (status, _, _) = send(router(&temp_dir), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    for uri in [
        "/content?path=nope.mp3",
        "/content?path=..%2F..%2Fetc%2Fpasswd",
        "/albumart?path=a.mp3",
        "/albumart?path=Sub%2F..%2Fa.mp3",
    ] {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, _, _) = send(router(&temp_dir), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}
