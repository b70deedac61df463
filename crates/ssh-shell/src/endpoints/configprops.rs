//! Effective configuration, with passwords masked.

use std::sync::Arc;

use serde_json::{Value, json};

use super::env::MASK;
use super::{Endpoint, EndpointRequest, ids};
use crate::config::ShellConfig;
use crate::error::CommandResult;

/// Serves the running [`ShellConfig`].
#[derive(Debug, Clone)]
pub struct ConfigPropsEndpoint {
    config: Arc<ShellConfig>,
}

impl ConfigPropsEndpoint {
    /// Serve `config`.
    #[must_use]
    pub const fn new(config: Arc<ShellConfig>) -> Self {
        Self { config }
    }
}

fn mask_passwords(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if key == "password" && !field.is_null() {
                    *field = Value::String(MASK.to_string());
                } else {
                    mask_passwords(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_passwords),
        _ => {}
    }
}

impl Endpoint for ConfigPropsEndpoint {
    fn id(&self) -> &str {
        ids::CONFIGPROPS
    }

    fn invoke(&self, _request: &EndpointRequest) -> CommandResult<Value> {
        let mut properties = serde_json::to_value(&*self.config)?;
        mask_passwords(&mut properties);
        Ok(json!({ "ssh-shell": { "prefix": "ssh-shell", "properties": properties } }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserConfig;

    #[test]
    fn passwords_are_masked() {
        let mut config = ShellConfig {
            password: Some("secret".into()),
            ..ShellConfig::default()
        };
        config.auth.users.push(UserConfig {
            name: "ops".into(),
            password: "pw".into(),
            roles: vec![],
        });
        let value = ConfigPropsEndpoint::new(Arc::new(config))
            .invoke(&EndpointRequest::new())
            .unwrap();
        let props = &value["ssh-shell"]["properties"];
        assert_eq!(props["password"], MASK);
        assert_eq!(props["auth"]["users"][0]["password"], MASK);
        assert_eq!(props["auth"]["users"][0]["name"], "ops");
        assert_eq!(props["port"], 2222);
    }

    #[test]
    fn unset_password_stays_null() {
        let value = ConfigPropsEndpoint::new(Arc::new(ShellConfig::default()))
            .invoke(&EndpointRequest::new())
            .unwrap();
        assert!(value["ssh-shell"]["properties"]["password"].is_null());
    }
}
