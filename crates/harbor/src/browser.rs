// ABOUTME: Dynamic fetching through a headless browser for sources rendered by client-side script.
// ABOUTME: Navigates, waits out fixed settle delays, clicks the reveal control, and captures the DOM.

//! Browser-driven capture.
//!
//! One source publishes its grid only after in-page script runs and a menu
//! control is clicked. There is no reliable load-completion signal on that
//! target, so the capture waits fixed, per-source settle delays between
//! steps (a documented fragility; the delays were tuned empirically).
//!
//! Every capture owns a freshly launched browser. Sessions are never
//! pooled or shared, and the session is torn down on every exit path —
//! success, partial capture, error, or panic — when the `Browser` drops at
//! the end of the blocking task.

use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions};

use crate::error::HarborError;

/// The rendered-DOM capture of one dynamic fetch.
///
/// `click_success == false` is a partial result, not a failure: the page
/// loaded but the grid control could not be found or clicked, so there are
/// no data rows to extract.
#[derive(Debug, Clone)]
pub struct DynamicCapture {
    pub click_success: bool,
    pub html: String,
    pub note: Option<String>,
}

/// Navigate to a script-rendered page, click the control that reveals the
/// data grid, and return the rendered DOM.
///
/// The whole capture runs inside a blocking task (the browser API is
/// synchronous) under an overall deadline of `nav_timeout` plus the settle
/// delays; exceeding it is a Timeout failure for this source only.
pub async fn capture_rendered(
    url: &str,
    control: &str,
    settle_after_load: Duration,
    settle_after_click: Duration,
    nav_timeout: Duration,
) -> Result<DynamicCapture, HarborError> {
    let url_owned = url.to_string();
    let control_owned = control.to_string();

    let handle = tokio::task::spawn_blocking(move || -> Result<DynamicCapture, HarborError> {
        let browser = Browser::new(LaunchOptions {
            headless: true,
            ..Default::default()
        })
        .map_err(|e| {
            HarborError::render(
                &url_owned,
                "CaptureRendered",
                Some(anyhow::anyhow!("browser launch failed: {}", e)),
            )
        })?;

        let tab = browser.new_tab().map_err(|e| {
            HarborError::render(
                &url_owned,
                "CaptureRendered",
                Some(anyhow::anyhow!("tab creation failed: {}", e)),
            )
        })?;

        tab.navigate_to(&url_owned).map_err(|e| {
            HarborError::render(
                &url_owned,
                "CaptureRendered",
                Some(anyhow::anyhow!("navigation failed: {}", e)),
            )
        })?;
        tab.wait_until_navigated().map_err(|e| {
            HarborError::render(
                &url_owned,
                "CaptureRendered",
                Some(anyhow::anyhow!("page load failed: {}", e)),
            )
        })?;

        // Let client-side script build the menu; no completion signal exists.
        std::thread::sleep(settle_after_load);

        let capture = match tab.find_element(&control_owned) {
            Ok(element) => match element.click() {
                Ok(_) => {
                    // The grid populates asynchronously after the click.
                    std::thread::sleep(settle_after_click);
                    let html = tab.get_content().map_err(|e| {
                        HarborError::render(
                            &url_owned,
                            "CaptureRendered",
                            Some(anyhow::anyhow!("content capture failed: {}", e)),
                        )
                    })?;
                    DynamicCapture {
                        click_success: true,
                        html,
                        note: None,
                    }
                }
                Err(e) => DynamicCapture {
                    click_success: false,
                    html: tab.get_content().unwrap_or_default(),
                    note: Some(format!("control click failed: {}", e)),
                },
            },
            Err(_) => DynamicCapture {
                click_success: false,
                html: tab.get_content().unwrap_or_default(),
                note: Some("control not visible".to_string()),
            },
        };

        Ok(capture)
        // browser drops here; the session is released on every path above
    });

    let budget = nav_timeout + settle_after_load + settle_after_click + Duration::from_secs(10);
    match tokio::time::timeout(budget, handle).await {
        Err(_) => Err(HarborError::timeout(
            url,
            "CaptureRendered",
            Some(anyhow::anyhow!(
                "browser capture exceeded {}s",
                budget.as_secs()
            )),
        )),
        Ok(Err(join_err)) => Err(HarborError::render(
            url,
            "CaptureRendered",
            Some(anyhow::anyhow!("capture task failed: {}", join_err)),
        )),
        Ok(Ok(result)) => result,
    }
}
