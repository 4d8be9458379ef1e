//! Host preflight checks.
//!
//! On Linux the device is only reachable by unprivileged users once a udev
//! rule grants access to its USB vendor id. Nothing the application does at
//! runtime can work around a missing rule, so `enforce` ends the process with
//! instructions instead of returning.

use anyhow::{anyhow, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

pub const DEFAULT_UDEV_RULES_DIR: &str = "/etc/udev/rules.d";
pub const DEVICE_VENDOR_ID: &str = "03e7";

/// Verifies the host can access the device.
pub trait PermissionsChecker {
    fn check(&self) -> Result<()>;
}

/// Looks for a udev rule matching the device vendor id.
#[derive(Clone, Debug)]
pub struct UdevRulesChecker {
    rules_dir: PathBuf,
    vendor_id: String,
}

impl Default for UdevRulesChecker {
    fn default() -> Self {
        Self::new(DEFAULT_UDEV_RULES_DIR)
    }
}

impl UdevRulesChecker {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            vendor_id: DEVICE_VENDOR_ID.to_string(),
        }
    }

    /// Text telling the user how to install the missing rule.
    pub fn guidance(&self) -> String {
        format!(
            "Set rules:\n\
             echo 'SUBSYSTEM==\"usb\", ATTRS{{idVendor}}==\"{vendor}\", MODE=\"0666\"' | sudo tee {dir}/80-movidius.rules\n\
             sudo udevadm control --reload-rules && sudo udevadm trigger\n\
             Disconnect/connect usb cable on host!",
            vendor = self.vendor_id,
            dir = self.rules_dir.display()
        )
    }

    /// True when any file under the rules directory grants the vendor id.
    pub fn rule_installed(&self) -> Result<bool> {
        let pattern = Regex::new(&format!(
            r#"(?i)ATTRS\{{idVendor\}}=="{}""#,
            regex::escape(&self.vendor_id)
        ))?;
        dir_contains_match(&self.rules_dir, &pattern)
    }

    #[cfg(target_os = "linux")]
    fn check_rules(&self) -> Result<()> {
        // An unreadable rules directory counts as a missing rule.
        let installed = self.rule_installed().unwrap_or_else(|err| {
            log::debug!("udev rules scan failed: {}", err);
            false
        });
        if installed {
            Ok(())
        } else {
            Err(anyhow!("usb rules not found\n\n{}", self.guidance()))
        }
    }
}

impl PermissionsChecker for UdevRulesChecker {
    fn check(&self) -> Result<()> {
        #[cfg(target_os = "linux")]
        {
            self.check_rules()
        }

        #[cfg(not(target_os = "linux"))]
        {
            Ok(())
        }
    }
}

fn dir_contains_match(dir: &Path, pattern: &Regex) -> Result<bool> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow!("failed to read {}: {}", dir.display(), e))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            if dir_contains_match(&path, pattern)? {
                return Ok(true);
            }
            continue;
        }
        // Binary or unreadable files cannot hold a rule.
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        if pattern.is_match(&contents) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Runs the checker; on failure prints guidance and exits with status 1.
pub fn enforce(checker: &dyn PermissionsChecker) {
    if let Err(err) = checker.check() {
        log::error!("preflight check failed");
        eprintln!("\nWARNING: {}", err);
        std::process::exit(1);
    }
}
