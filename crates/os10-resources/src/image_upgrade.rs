//! Software image installation.
//!
//! Not a reconciled resource: installing an image is a long-running device
//! operation. The installer must be idle before a download starts; progress
//! is observed by polling the image status at a fixed interval until the
//! installer returns to idle, after which the boot marker moves to the
//! standby partition and the switch reloads. Unsaved configuration is
//! saved before the reload. The poll loop runs until the installer leaves
//! the install state; the transport's own limits are the only timeout.

use std::time::Duration;

use serde_json::Value;

use os10_cfg_common::{show, CfgError, CfgResult, CommandExecutor};

const STATUS_QUERY: &str = "show image status | display-json";
const STATE_IDLE: &str = "idle";
const TRANSFER_OK: &str = "Completed: No error";
const INSTALL_OK: &str = "Completed: Success";

/// One image installation request.
pub struct ImageUpgrade {
    url: String,
    poll_interval: Duration,
}

/// Installer status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InstallerStatus {
    state: String,
    progress: Option<String>,
    transfer_detail: Option<String>,
    install_detail: Option<String>,
}

impl ImageUpgrade {
    /// Creates an installation request for an image URL.
    pub fn new(url: impl Into<String>) -> Self {
        ImageUpgrade {
            url: url.into(),
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Overrides the status poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Downloads and installs the image into the standby partition, then
    /// boots from it.
    ///
    /// Fails with a mismatch error when the installer is busy, and with a
    /// write failure when the install completes unsuccessfully.
    pub async fn run<E: CommandExecutor>(&self, executor: &mut E) -> CfgResult<()> {
        let status = read_status(executor).await?;
        if status.state != STATE_IDLE {
            return Err(CfgError::mismatch(
                "installer",
                STATE_IDLE,
                status.state,
            ));
        }

        tracing::info!(url = %self.url, "Starting image install");
        executor.show(&format!("image install {}", self.url)).await?;

        // Poll until the installer transitions back to idle.
        let mut old_state = status.state;
        let status = loop {
            tokio::time::sleep(self.poll_interval).await;
            let status = read_status(executor).await?;
            tracing::debug!(
                state = %status.state,
                progress = ?status.progress,
                detail = ?status.install_detail,
                "Installer status"
            );
            if status.state != old_state {
                tracing::info!(
                    from = %old_state,
                    to = %status.state,
                    "Installer state changed"
                );
                if status.state == STATE_IDLE {
                    break status;
                }
                old_state = status.state.clone();
            }
        };

        let transfer = status.transfer_detail.unwrap_or_default();
        let install = status.install_detail.unwrap_or_default();
        if transfer != TRANSFER_OK || install != INSTALL_OK {
            return Err(CfgError::write(
                format!("image install {}", self.url),
                format!("transfer '{transfer}', install '{install}'"),
            ));
        }

        tracing::info!("Install complete, reloading to standby partition");
        executor.show("boot system standby").await?;
        executor.show("write memory").await?;
        executor.show("reload").await?;
        tokio::time::sleep(self.poll_interval).await;
        executor.show("yes").await?;
        Ok(())
    }
}

async fn read_status<E: CommandExecutor>(executor: &mut E) -> CfgResult<InstallerStatus> {
    let tree = executor.show(STATUS_QUERY).await?;
    parse_status(&tree)
}

fn parse_status(tree: &Value) -> CfgResult<InstallerStatus> {
    let Some(status) = show::extract(
        tree,
        &["data", "system-sw-state", "software-upgrade-status"],
    ) else {
        return Err(CfgError::parse("missing software-upgrade-status"));
    };
    let Some(state) = show::extract_str(status, &["global-state"]) else {
        return Err(CfgError::parse("missing installer global-state"));
    };
    Ok(InstallerStatus {
        state,
        progress: show::extract_str(status, &["file-transfer-status", "file-progress"]),
        transfer_detail: show::extract_str(status, &["file-transfer-status", "task-state-detail"]),
        install_detail: show::extract_str(
            status,
            &["software-install-status", "task-state-detail"],
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status_tree(state: &str, transfer: &str, install: &str) -> Value {
        json!({
            "data": {
                "system-sw-state": {
                    "software-upgrade-status": {
                        "global-state": state,
                        "file-transfer-status": {
                            "file-progress": "100",
                            "task-state-detail": transfer
                        },
                        "software-install-status": {
                            "task-state-detail": install
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_status() {
        let status =
            parse_status(&status_tree("install", "In progress", "In progress")).unwrap();
        assert_eq!(status.state, "install");
        assert_eq!(status.progress.as_deref(), Some("100"));
    }

    #[test]
    fn test_parse_status_missing_tree() {
        assert!(parse_status(&json!({"data": {}})).is_err());
    }

    #[test]
    fn test_success_details() {
        let status = parse_status(&status_tree(
            STATE_IDLE,
            TRANSFER_OK,
            INSTALL_OK,
        ))
        .unwrap();
        assert_eq!(status.transfer_detail.as_deref(), Some(TRANSFER_OK));
        assert_eq!(status.install_detail.as_deref(), Some(INSTALL_OK));
    }

    #[tokio::test]
    async fn test_run_polls_until_idle_then_reloads() {
        let mut executor = os10_cfg_test::MockExecutor::new()
            .with_show(STATUS_QUERY, status_tree(STATE_IDLE, "", ""))
            .with_show(
                STATUS_QUERY,
                status_tree("install", "In progress", "In progress"),
            )
            .with_show(STATUS_QUERY, status_tree(STATE_IDLE, TRANSFER_OK, INSTALL_OK))
            .with_show("image install http://host/PKGS_OS10.bin", Value::Null)
            .with_show("boot system standby", Value::Null)
            .with_show("write memory", Value::Null)
            .with_show("reload", Value::Null)
            .with_show("yes", Value::Null);

        ImageUpgrade::new("http://host/PKGS_OS10.bin")
            .with_poll_interval(Duration::from_millis(1))
            .run(&mut executor)
            .await
            .unwrap();
        assert!(executor.is_untouched());
    }

    #[tokio::test]
    async fn test_run_refuses_busy_installer() {
        let mut executor = os10_cfg_test::MockExecutor::new().with_show(
            STATUS_QUERY,
            status_tree("download", "In progress", "In progress"),
        );
        let err = ImageUpgrade::new("http://host/PKGS_OS10.bin")
            .run(&mut executor)
            .await
            .unwrap_err();
        assert!(matches!(err, CfgError::Mismatch { .. }));
    }

    #[tokio::test]
    async fn test_run_fails_on_bad_install_detail() {
        let mut executor = os10_cfg_test::MockExecutor::new()
            .with_show(STATUS_QUERY, status_tree(STATE_IDLE, "", ""))
            .with_show(
                STATUS_QUERY,
                status_tree("install", "In progress", "In progress"),
            )
            .with_show(
                STATUS_QUERY,
                status_tree(STATE_IDLE, TRANSFER_OK, "Completed: Failure"),
            )
            .with_show("image install http://host/PKGS_OS10.bin", Value::Null);

        let err = ImageUpgrade::new("http://host/PKGS_OS10.bin")
            .with_poll_interval(Duration::from_millis(1))
            .run(&mut executor)
            .await
            .unwrap_err();
        assert!(err.is_write_failure());
    }
}
