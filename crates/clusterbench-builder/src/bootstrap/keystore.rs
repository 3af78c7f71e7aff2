use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use clusterbench_core::{BootstrapPhase, CoreResult};

use super::{run_binary, BootstrapHook, BootstrapHookRegistry, HookContext};

pub const COMPONENT: &str = "repository-gcs";

const KEYSTORE_BINARY: &str = "opensearch-keystore";
const CLIENT_NAME: &str = "gcs_client_name";
const CREDENTIALS_FILE: &str = "gcs_credentials_file";

/// Adds the GCS service account credentials to the node keystore.
pub struct ConfigureKeystore;

#[async_trait]
impl BootstrapHook for ConfigureKeystore {
    fn name(&self) -> &'static str {
        "configure_keystore"
    }

    async fn invoke(&self, ctx: &HookContext<'_>) -> CoreResult<bool> {
        let (Some(client_name), Some(credentials_file)) =
            (ctx.variables.get(CLIENT_NAME), ctx.variables.get(CREDENTIALS_FILE))
        else {
            warn!(
                host = %ctx.host.name,
                "skipping keystore configuration for repository-gcs, plugin params [{CLIENT_NAME}, {CREDENTIALS_FILE}] were not supplied"
            );
            return Ok(false);
        };

        let install_root = PathBuf::from(ctx.required("install_root_path")?);
        let keystore = ctx.binary(KEYSTORE_BINARY)?;
        let keystore_file = install_root.join("config").join("opensearch.keystore");

        let exists = ctx
            .executor
            .execute(ctx.host, &format!("test -f {}", keystore_file.display()), false)
            .await
            .is_ok();
        if !exists {
            info!(host = %ctx.host.name, "creating keystore");
            run_binary(
                ctx,
                KEYSTORE_BINARY,
                &format!("{} --silent create", keystore.display()),
                "Could not initialize a keystore.",
            )
            .await?;
        }

        run_binary(
            ctx,
            KEYSTORE_BINARY,
            &format!(
                "{} --silent add-file gcs.client.{client_name}.credentials_file {credentials_file}",
                keystore.display()
            ),
            "Could not add GCS keystore secure setting.",
        )
        .await?;
        Ok(true)
    }
}

pub fn register(registry: &mut BootstrapHookRegistry, component: &str) -> CoreResult<()> {
    registry.register(
        BootstrapPhase::PostInstall.name(),
        component,
        Arc::new(ConfigureKeystore),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use clusterbench_core::{CoreError, Host, Variables};

    fn variables(with_params: bool) -> Variables {
        let mut variables = Variables::new();
        variables.insert("install_root_path".into(), "/opt/n".into());
        if with_params {
            variables.insert(CLIENT_NAME.into(), "default".into());
            variables.insert(CREDENTIALS_FILE.into(), "/secrets/gcs.json".into());
        }
        variables
    }

    async fn invoke(executor: &MockExecutor, vars: &Variables) -> CoreResult<bool> {
        let host = Host::new("a", "10.0.0.1");
        ConfigureKeystore
            .invoke(&HookContext {
                component: COMPONENT,
                active: &[],
                variables: vars,
                host: &host,
                executor,
            })
            .await
    }

    #[tokio::test]
    async fn test_skips_without_params() {
        let executor = MockExecutor::new();
        assert!(!invoke(&executor, &variables(false)).await.unwrap());
        assert!(executor.commands().is_empty());
    }

    #[tokio::test]
    async fn test_creates_missing_keystore() {
        let executor = MockExecutor::new().fail_on("test -f", 1);
        assert!(invoke(&executor, &variables(true)).await.unwrap());
        assert_eq!(
            executor.commands(),
            vec![
                "test -f /opt/n/config/opensearch.keystore",
                "/opt/n/bin/opensearch-keystore --silent create",
                "/opt/n/bin/opensearch-keystore --silent add-file gcs.client.default.credentials_file /secrets/gcs.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_add_file_failure_is_setup_error() {
        let executor = MockExecutor::new().fail_on("add-file", 65);
        let err = invoke(&executor, &variables(true)).await.unwrap_err();
        assert!(matches!(err, CoreError::Setup { ref message, .. } if message.contains("code [65]")));
    }
}
