//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Serialize layout nodes to `[[layouts]]` entries
    pub(super) fn layouts_to_toml(&self) -> String {
        if self.layouts.is_empty() {
            // Show example comments when no layouts are configured
            return r#"
# Layout nodes, parents first. Lengths: 120 (px), 10% (of the parent),
# 50vw / 50vh (of the window), and sums such as 100%-56.
# Without any [[layouts]] the demo uses topnav / sidebar / content.
#
# [[layouts]]
# name = "topnav"
# width = "100%"
# height = "56"
#
# [[layouts]]
# name = "sidebar"
# y = "56"
# width = "220"
# height = "100%-56"
#
# [[layouts]]
# name = "content"
# x = "220"
# y = "56"
# width = "100%-220"
# height = "100%-56"
"#
            .to_string();
        }

        let mut output = String::new();
        for spec in &self.layouts {
            output.push_str("\n[[layouts]]\n");
            output.push_str(&format!("name = {:?}\n", spec.name));
            if let Some(parent) = &spec.parent {
                output.push_str(&format!("parent = {:?}\n", parent));
            }
            output.push_str(&format!("x = {:?}\n", spec.x));
            output.push_str(&format!("y = {:?}\n", spec.y));
            output.push_str(&format!("width = {:?}\n", spec.width));
            output.push_str(&format!("height = {:?}\n", spec.height));
        }
        output
    }

    /// Render the full config file
    pub fn to_toml(&self) -> String {
        let boot = match &self.boot {
            Some(path) => format!("boot = {:?}", path),
            None => "# boot = \"content.deck\"".to_string(),
        };

        format!(
            r#"# panelkit configuration

# Selector of the host element the root panel mounts under
mount = {mount:?}

# Panel to navigate to after boot (dotted path or bare panel name)
{boot}

# Initial window size (PANELKIT_WIDTH / PANELKIT_HEIGHT override)
[window]
width = {width:?}
height = {height:?}

# Logging configuration (RUST_LOG, then PANELKIT_LOG, override the level)
[logging]
level = {log_level:?}
# JSON file logging (in addition to stderr)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir:?}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix:?}
{layouts}"#,
            mount = self.mount,
            boot = boot,
            width = self.window.width,
            height = self.window.height,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = self.logging.file_dir.display().to_string(),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = self.logging.file_prefix,
            layouts = self.layouts_to_toml(),
        )
    }
}
