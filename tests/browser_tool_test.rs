//! Integration tests for the browser tool over a recording driver

mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use ui_test_agent::{
    BrowserSettings, BrowserTool, Error, MAX_CONTENT_CHARS, ReleaseStage, Tool, ToolError,
    ToolRegistry, Viewport,
};

fn browser(driver: MockDriver, dir: &std::path::Path) -> BrowserTool {
    BrowserTool::new(
        Arc::new(driver),
        BrowserSettings::new("https://example.com", dir.join("shots"))
            .with_screenshot_delay(Duration::ZERO),
    )
}

/// Test: screenshots are numbered from 1 and saved to disk
/// Expected: screenshot_1.png and screenshot_2.png exist, each result carries the image
#[tokio::test]
async fn test_screenshot_counter_and_files() {
    let dir = tempfile::tempdir().unwrap();
    let tool = BrowserTool::new(
        Arc::new(MockDriver::new()),
        BrowserSettings::new("https://example.com", dir.path().join("shots"))
            .with_viewport(Viewport { width: 1024, height: 768 })
            .with_screenshot_delay(Duration::ZERO),
    );
    tool.start().await.unwrap();

    let first = tool.invoke("screenshot", &json!({"action": "screenshot"})).await.unwrap();
    let second = tool.invoke("screenshot", &json!({"action": "screenshot"})).await.unwrap();

    let first_output = first.output.unwrap();
    assert!(first_output.contains("1024x768"));
    assert!(first_output.ends_with("screenshot_1.png"));
    assert!(second.output.unwrap().ends_with("screenshot_2.png"));
    assert_eq!(first.image.as_deref(), Some(PNG_BYTES));

    let shots = dir.path().join("shots");
    assert_eq!(std::fs::read(shots.join("screenshot_1.png")).unwrap(), PNG_BYTES);
    assert!(shots.join("screenshot_2.png").is_file());

    tool.close().await.unwrap();
}

/// Test: a screenshot waits for the page to settle before capturing
/// Scenario: 120ms settle delay, one screenshot
/// Expected: the call takes at least the delay and still produces screenshot_1.png
#[tokio::test]
async fn test_screenshot_waits_for_settle_delay() {
    let dir = tempfile::tempdir().unwrap();
    let delay = Duration::from_millis(120);
    let tool = BrowserTool::new(
        Arc::new(MockDriver::new()),
        BrowserSettings::new("https://example.com", dir.path()).with_screenshot_delay(delay),
    );
    tool.start().await.unwrap();

    let started = std::time::Instant::now();
    let result = tool.invoke("screenshot", &json!({"action": "screenshot"})).await.unwrap();

    assert!(started.elapsed() >= delay);
    assert!(result.output.unwrap().ends_with("screenshot_1.png"));
    assert!(dir.path().join("screenshot_1.png").is_file());

    tool.close().await.unwrap();
}

/// Test: each input action reaches the session with its arguments
#[tokio::test]
async fn test_input_actions() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new();
    let log = driver.log.clone();
    let tool = browser(driver, dir.path());
    tool.start().await.unwrap();

    let click = tool.invoke("click", &json!({"x": 10, "y": 20})).await.unwrap();
    assert_eq!(click.output.as_deref(), Some("Clicked at (10, 20)"));

    let typed = tool.invoke("type", &json!({"text": "lofi music"})).await.unwrap();
    assert_eq!(typed.output.as_deref(), Some("Typed 10 characters"));

    let key = tool.invoke("key", &json!({"text": "enter"})).await.unwrap();
    assert_eq!(key.output.as_deref(), Some("Pressed key Enter"));

    tool.invoke("scroll", &json!({"x": 0, "y": 400})).await.unwrap();
    tool.invoke("mouse_move", &json!({"x": 5.4, "y": 6})).await.unwrap();

    let title = tool.invoke("get_title", &json!({})).await.unwrap();
    assert_eq!(title.output.as_deref(), Some("Mock Page"));

    assert_eq!(
        entries(&log)[1..],
        [
            "click 10,20",
            "type lofi music",
            "key Enter",
            "scroll 0,400",
            "mouse_move 5,6",
        ]
    );
    tool.close().await.unwrap();
}

/// Test: missing parameters are reported to the model, not executed
#[tokio::test]
async fn test_missing_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new();
    let log = driver.log.clone();
    let tool = browser(driver, dir.path());
    tool.start().await.unwrap();

    let click = tool.invoke("click", &json!({"x": 10})).await.unwrap();
    assert_eq!(
        click.error.as_deref(),
        Some("Numeric 'x' and 'y' are required for click action")
    );

    let navigate = tool.invoke("navigate", &json!({"url": ""})).await.unwrap();
    assert_eq!(
        navigate.error.as_deref(),
        Some("'url' is required for navigate action")
    );

    assert_eq!(entries(&log).len(), 1);
    tool.close().await.unwrap();
}

/// Test: page content is capped
#[tokio::test]
async fn test_get_content_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver {
        page_content: "é".repeat(MAX_CONTENT_CHARS + 100),
        ..MockDriver::new()
    };
    let tool = browser(driver, dir.path());
    tool.start().await.unwrap();

    let output = tool
        .invoke("get_content", &json!({}))
        .await
        .unwrap()
        .output
        .unwrap();
    let (body, note) = output.split_once('\n').unwrap();
    assert_eq!(body.chars().count(), MAX_CONTENT_CHARS);
    assert_eq!(note, format!("[content truncated to {} characters]", MAX_CONTENT_CHARS));

    tool.close().await.unwrap();
}

/// Test: unsupported actions and use outside a started session
#[tokio::test]
async fn test_invocation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let tool = browser(MockDriver::new(), dir.path());

    let err = tool.invoke("fly", &json!({})).await.unwrap_err();
    assert!(matches!(err, ToolError::Invocation(ref m) if m == "Unknown action: fly"));

    let err = tool.invoke("screenshot", &json!({})).await.unwrap_err();
    assert!(matches!(err, ToolError::Unexpected(Error::Session(_))));

    let registry = ToolRegistry::register(vec![Arc::new(tool)]).unwrap();
    let result = registry
        .dispatch("browser", &json!({"action": "get_title"}))
        .await;
    assert!(result.error.unwrap().starts_with("Unexpected error: Browser session error:"));
}

/// Test: teardown keeps going after a failed stage
/// Scenario: releasing the page fails
/// Expected: all four stages attempted in order, close reports the page failure
#[tokio::test]
async fn test_close_continues_after_release_failure() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver {
        fail_release: Some(ReleaseStage::Page),
        ..MockDriver::new()
    };
    let log = driver.log.clone();
    let tool = browser(driver, dir.path());
    tool.start().await.unwrap();

    let err = tool.close().await.unwrap_err();
    match err {
        Error::Teardown(failures) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].starts_with("page:"));
        }
        other => panic!("expected teardown error, got {:?}", other),
    }
    assert_eq!(
        entries(&log)[1..],
        ["release page", "release context", "release browser", "release driver"]
    );
}

/// Test: lifecycle edges
/// Expected: closing an unstarted tool is a no-op; a closed tool cannot restart
#[tokio::test]
async fn test_lifecycle_edges() {
    let dir = tempfile::tempdir().unwrap();
    let driver = MockDriver::new();
    let log = driver.log.clone();
    let tool = browser(driver, dir.path());

    tool.close().await.unwrap();
    assert!(entries(&log).is_empty());
    assert!(matches!(tool.start().await, Err(Error::Session(_))));

    let fresh = browser(MockDriver::new(), dir.path());
    fresh.start().await.unwrap();
    assert!(matches!(fresh.start().await, Err(Error::Session(_))));
    fresh.close().await.unwrap();
}

/// Test: two tools named "browser" cannot share a registry
#[test]
fn test_duplicate_browser_registration() {
    let dir = tempfile::tempdir().unwrap();
    let err = ToolRegistry::register(vec![
        Arc::new(browser(MockDriver::new(), dir.path())),
        Arc::new(browser(MockDriver::new(), dir.path())),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::Config(ref m) if m == "Duplicate tool name: browser"));
}
