mod common;

use common::*;
use makaba::{media::Category, thread::Post, Error};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn post(files: Vec<serde_json::Value>) -> Post {
    serde_json::from_value(json!({ "num": 7, "files": files })).unwrap()
}

async fn mount_files(server: &MockServer) {
    mount_bytes(server, "/b/src/7/1.mp4", b"first").await;
    mount_bytes(server, "/b/src/7/2.jpg", b"second").await;
    mount_bytes(server, "/b/src/7/3.webm", b"third").await;
    mount_bytes(server, "/b/src/7/4.gif", b"fourth").await;
}

fn four_files() -> Post {
    post(vec![
        media(10, "a.mp4", "/b/src/7/1.mp4"),
        media(1, "b.jpg", "/b/src/7/2.jpg"),
        media(6, "c.webm", "/b/src/7/3.webm"),
        media(4, "d.gif", "/b/src/7/4.gif"),
    ])
}

#[tokio::test]
async fn sequential_download_writes_matching_files() {
    let server = server().await;
    mount_files(&server).await;
    let client = client(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let report = client
        .download_from_post(&four_files(), &out, Category::VIDEO)
        .await
        .unwrap()
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(
        report.paths(),
        [out.join("a.mp4"), out.join("c.webm"), out.join("d.gif")]
    );
    assert_eq!(std::fs::read(out.join("a.mp4")).unwrap(), b"first");
    assert_eq!(std::fs::read(out.join("d.gif")).unwrap(), b"fourth");
    assert!(!out.join("b.jpg").exists());
}

#[tokio::test]
async fn pooled_download_keeps_selection_order() {
    let server = server().await;
    mount_files(&server).await;
    let client = builder(&server)
        .concurrent(true)
        .workers(3)
        .build()
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let report = client
        .download_from_post(&four_files(), dir.path(), Category::ALL)
        .await
        .unwrap()
        .unwrap();

    let names: Vec<String> = report
        .paths()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.mp4", "b.jpg", "c.webm", "d.gif"]);
    assert!(report.is_complete());
    assert_eq!(std::fs::read(dir.path().join("b.jpg")).unwrap(), b"second");
    assert_eq!(std::fs::read(dir.path().join("c.webm")).unwrap(), b"third");
}

#[tokio::test]
async fn more_workers_than_files() {
    let server = server().await;
    mount_files(&server).await;
    let client = builder(&server)
        .concurrent(true)
        .workers(32)
        .build()
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let report = client
        .download_from_post(&four_files(), dir.path(), Category::MP4)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.paths(), [dir.path().join("a.mp4")]);
    assert!(report.is_complete());
}

#[tokio::test]
async fn failed_file_is_reported_and_the_rest_still_lands() {
    for concurrent in [false, true] {
        let server = server().await;
        mount_bytes(&server, "/b/src/7/1.mp4", b"first").await;
        mount_bytes(&server, "/b/src/7/3.webm", b"third").await;
        let client = builder(&server)
            .concurrent(concurrent)
            .workers(2)
            .build()
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();

        let report = client
            .download_from_post(&four_files(), dir.path(), Category::ALL)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.paths().len(), 4);
        let failed: Vec<_> = report.failures().iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            failed,
            vec![dir.path().join("b.jpg"), dir.path().join("d.gif")]
        );
        assert!(report
            .failures()
            .iter()
            .all(|(_, err)| matches!(err, Error::Download { .. })));
        assert_eq!(report.downloaded().count(), 2);
        assert!(dir.path().join("c.webm").exists());

        match report.into_result() {
            Err(Error::Download { path, source }) => {
                assert_eq!(path, dir.path().join("b.jpg"));
                assert!(matches!(*source, Error::StatusMismatch { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}

#[tokio::test]
async fn nothing_to_download_is_none() {
    let server = server().await;
    let client = client(&server).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("untouched");

    let images = post(vec![media(2, "a.png", "/b/src/7/a.png")]);
    assert!(client
        .download_from_post(&images, &out, Category::WEBM)
        .await
        .unwrap()
        .is_none());
    assert!(client
        .download_from_post(&post(vec![]), &out, Category::ALL)
        .await
        .unwrap()
        .is_none());
    assert!(!out.exists());
}

#[tokio::test]
async fn thread_media_and_single_files() {
    let server = server().await;
    mount_files(&server).await;
    mount_json(
        &server,
        "/b/res/7.json",
        thread(vec![
            json!({ "num": 7, "files": [ media(10, "a.mp4", "/b/src/7/1.mp4") ] }),
            json!({ "num": 8, "files": [ media(1, "b.jpg", "/b/src/7/2.jpg"),
                                         media(4, "d.gif", "/b/src/7/4.gif") ] }),
        ]),
    )
    .await;
    let client = client(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let report = client
        .download_thread_media(7u64, dir.path(), Category::IMAGES)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.into_result().unwrap(), [dir.path().join("b.jpg")]);

    let posts = client.thread_posts(7u64, None).await.unwrap();
    let gif = &posts[1].files()[1];
    let path = client.download_file(gif, dir.path()).await.unwrap();
    assert_eq!(path, dir.path().join("d.gif"));
    assert_eq!(std::fs::read(path).unwrap(), b"fourth");

    let missing = post(vec![media(10, "gone.mp4", "/b/src/7/gone.mp4")]);
    match client.download_file(&missing.files()[0], dir.path()).await {
        Err(Error::Download { path, .. }) => assert_eq!(path, dir.path().join("gone.mp4")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn failure_of_a_same_named_file_keeps_the_other() {
    let server = server().await;
    mount_bytes(&server, "/b/src/7/1.webm", b"kept").await;
    let client = client(&server).await;
    let dir = tempfile::tempdir().unwrap();

    let twins = post(vec![
        media(6, "clip.webm", "/b/src/7/1.webm"),
        media(6, "clip.webm", "/b/src/7/2.webm"),
    ]);
    let report = client
        .download_from_post(&twins, dir.path(), Category::WEBM)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.failures().len(), 1);
    let ok: Vec<_> = report.downloaded().collect();
    assert_eq!(ok, vec![dir.path().join("clip.webm").as_path()]);
    assert_eq!(std::fs::read(dir.path().join("clip.webm")).unwrap(), b"kept");
}

#[tokio::test]
async fn downloads_have_their_own_timeout() {
    let server = server().await;
    Mock::given(method("GET"))
        .and(path("/b/src/7/slow.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"slow".to_vec())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    let slow = post(vec![media(10, "slow.mp4", "/b/src/7/slow.mp4")]);
    let dir = tempfile::tempdir().unwrap();

    let patient = builder(&server)
        .timeout(Duration::from_millis(200))
        .build()
        .await
        .unwrap();
    assert_eq!(
        patient.downloader().download_timeout(),
        makaba::media::DEFAULT_DOWNLOAD_TIMEOUT
    );
    let path = patient
        .download_file(&slow.files()[0], dir.path())
        .await
        .unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"slow");

    let hasty = builder(&server)
        .download_timeout(Duration::from_millis(100))
        .build()
        .await
        .unwrap();
    match hasty.download_file(&slow.files()[0], dir.path()).await {
        Err(Error::Download { source, .. }) => {
            assert!(matches!(*source, Error::TransportUnavailable(_)));
        }
        other => panic!("unexpected: {other:?}"),
    }
}
