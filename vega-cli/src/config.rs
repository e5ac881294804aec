//! API key resolution (spec §6 "Environment / configuration"):
//! `ANTHROPIC_API_KEY` takes precedence over a line of the same name in
//! `$HOME/.vega`. Neither being set is not an error — only agent-spawning
//! programs ever need a key, and the agent manager surfaces an empty key
//! as an ordinary HTTP auth failure on the first send.

const ENV_VAR: &str = "ANTHROPIC_API_KEY";
const CONFIG_FILE: &str = ".vega";

/// Resolve the API key the runtime will send as `x-api-key`, or `None` if
/// neither the environment nor `$HOME/.vega` set one.
#[must_use]
pub fn resolve_api_key() -> Option<String> {
    if let Ok(key) = std::env::var(ENV_VAR) {
        if !key.is_empty() {
            return Some(key);
        }
    }
    read_home_config().and_then(|contents| {
        contents.lines().find_map(|line| {
            let line = line.trim();
            let rest = line.strip_prefix(ENV_VAR)?.trim_start();
            let value = rest.strip_prefix('=')?.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
    })
}

fn read_home_config() -> Option<String> {
    let home = std::env::var_os("HOME")?;
    std::fs::read_to_string(std::path::Path::new(&home).join(CONFIG_FILE)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_assignment_with_surrounding_whitespace() {
        let contents = "# vega config\nANTHROPIC_API_KEY = sk-test-123\n";
        let found = contents.lines().find_map(|line| {
            let line = line.trim();
            let rest = line.strip_prefix(ENV_VAR)?.trim_start();
            let value = rest.strip_prefix('=')?.trim();
            (!value.is_empty()).then(|| value.to_string())
        });
        assert_eq!(found.as_deref(), Some("sk-test-123"));
    }

    #[test]
    fn ignores_unrelated_lines() {
        let contents = "SOME_OTHER_VAR=1\n";
        let found = contents.lines().find_map(|line| {
            let line = line.trim();
            let rest = line.strip_prefix(ENV_VAR)?.trim_start();
            let value = rest.strip_prefix('=')?.trim();
            (!value.is_empty()).then(|| value.to_string())
        });
        assert_eq!(found, None);
    }
}
