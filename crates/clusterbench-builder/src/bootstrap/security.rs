use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use minijinja::context;
use tracing::info;

use clusterbench_core::{BootstrapPhase, CoreResult};

use super::{run_binary, BootstrapHook, BootstrapHookRegistry, HookContext};
use crate::template::TemplateRenderer;

pub const COMPONENT: &str = "security";

const CERT_BINARY: &str = "opensearch-certutil";
const USERS_BINARY: &str = "opensearch-users";

const INSTANCES_TEMPLATE: &str = r#"instances:
  - name: "{{ node_name }}"
    ip:
      - "{{ node_ip }}"
"#;

/// Issues a node certificate from a pre-bundled CA and unpacks it into the config directory.
pub struct InstallCertificates {
    renderer: TemplateRenderer,
    ca_path: Option<PathBuf>,
}

impl InstallCertificates {
    /// `ca_path` holds `ca.crt` and `ca.key`. Defaults to `<install root>/config/ca`.
    pub fn new(ca_path: Option<PathBuf>) -> Self {
        Self {
            renderer: TemplateRenderer::new(),
            ca_path,
        }
    }
}

#[async_trait]
impl BootstrapHook for InstallCertificates {
    fn name(&self) -> &'static str {
        "install_certificates"
    }

    async fn invoke(&self, ctx: &HookContext<'_>) -> CoreResult<bool> {
        if !ctx.is_active(COMPONENT) {
            return Ok(false);
        }

        let node_name = ctx.required("node_name")?;
        let node_ip = ctx.required("node_ip")?;
        let install_root = PathBuf::from(ctx.required("install_root_path")?);
        let ca_path = self
            .ca_path
            .clone()
            .unwrap_or_else(|| install_root.join("config").join("ca"));

        info!(host = %ctx.host.name, node = node_name, "installing certificates");

        let manifest = self.renderer.render_str(
            INSTANCES_TEMPLATE,
            context! { node_name => node_name, node_ip => node_ip },
        )?;
        let staging = tempfile::tempdir()?;
        let local = staging.path().join("instances.yml");
        tokio::fs::write(&local, manifest).await?;

        let instances = install_root.join("instances.yml");
        ctx.executor.copy(ctx.host, &local, &instances).await?;

        let bundle = install_root.join("node-cert.zip");
        let certutil = ctx.binary(CERT_BINARY)?;
        let command = format!(
            r#"{} cert --silent --in "{}" --out="{}" --ca-cert="{}/ca.crt" --ca-key="{}/ca.key" --pass """#,
            certutil.display(),
            instances.display(),
            bundle.display(),
            ca_path.display(),
            ca_path.display(),
        );
        run_binary(
            ctx,
            CERT_BINARY,
            &command,
            &format!("Could not create certificate bundle for node [{node_name}]."),
        )
        .await?;

        let target = install_root.join("config").join("security");
        ctx.executor
            .execute(
                ctx.host,
                &format!("unzip -o -q {} -d {}", bundle.display(), target.display()),
                false,
            )
            .await?;
        Ok(true)
    }
}

/// Creates the user the benchmark authenticates as.
pub struct AddBenchmarkUser;

#[async_trait]
impl BootstrapHook for AddBenchmarkUser {
    fn name(&self) -> &'static str {
        "add_benchmark_user"
    }

    async fn invoke(&self, ctx: &HookContext<'_>) -> CoreResult<bool> {
        if !ctx.is_active(COMPONENT) {
            return Ok(false);
        }

        let variable = |key: &str, default: &'static str| {
            ctx.variables.get(key).map_or(default, String::as_str)
        };
        let user = variable("security_user_name", "benchmark");
        let password = variable("security_user_password", "benchmark-password");
        let role = variable("security_user_role", "superuser");
        let users = ctx.binary(USERS_BINARY)?;

        info!(host = %ctx.host.name, user, "adding benchmark user");
        run_binary(
            ctx,
            USERS_BINARY,
            &format!(r#"{} useradd {user} -p "{password}""#, users.display()),
            &format!("Could not add user '{user}'."),
        )
        .await?;
        run_binary(
            ctx,
            USERS_BINARY,
            &format!("{} roles {user} -a {role}", users.display()),
            &format!("Could not add role '{role}' for user '{user}'."),
        )
        .await?;
        Ok(true)
    }
}

pub fn register(
    registry: &mut BootstrapHookRegistry,
    component: &str,
    root_path: Option<PathBuf>,
) -> CoreResult<()> {
    let phase = BootstrapPhase::PostInstall.name();
    registry.register(
        phase,
        component,
        Arc::new(InstallCertificates::new(root_path.map(|root| root.join("ca")))),
    )?;
    registry.register(phase, component, Arc::new(AddBenchmarkUser))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use clusterbench_core::{CoreError, Host, Variables};

    fn variables() -> Variables {
        let mut variables = Variables::new();
        variables.insert("install_root_path".into(), "/opt/bench/install/a".into());
        variables.insert("node_name".into(), "benchmark-node-a".into());
        variables.insert("node_ip".into(), "10.0.0.1".into());
        variables
    }

    fn ctx<'a>(
        active: &'a [String],
        variables: &'a Variables,
        host: &'a Host,
        executor: &'a MockExecutor,
    ) -> HookContext<'a> {
        HookContext {
            component: COMPONENT,
            active,
            variables,
            host,
            executor,
        }
    }

    #[tokio::test]
    async fn test_hooks_skip_when_inactive() {
        let executor = MockExecutor::new();
        let host = Host::new("a", "10.0.0.1");
        let vars = variables();
        let active = vec!["analysis-icu".to_string()];
        let ctx = ctx(&active, &vars, &host, &executor);

        assert!(!InstallCertificates::new(None).invoke(&ctx).await.unwrap());
        assert!(!AddBenchmarkUser.invoke(&ctx).await.unwrap());
        assert!(executor.commands().is_empty());
        assert!(executor.copies().is_empty());
    }

    #[tokio::test]
    async fn test_install_certificates() {
        let executor = MockExecutor::new();
        let host = Host::new("a", "10.0.0.1");
        let vars = variables();
        let active = vec![COMPONENT.to_string()];

        let performed = InstallCertificates::new(Some(PathBuf::from("/configs/security/ca")))
            .invoke(&ctx(&active, &vars, &host, &executor))
            .await
            .unwrap();
        assert!(performed);

        let copies = executor.copies();
        assert_eq!(copies[0].destination, PathBuf::from("/opt/bench/install/a/instances.yml"));
        assert!(copies[0].content.contains(r#"name: "benchmark-node-a""#));
        assert!(copies[0].content.contains(r#"- "10.0.0.1""#));

        let commands = executor.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("/opt/bench/install/a/bin/opensearch-certutil cert --silent"));
        assert!(commands[0].contains(r#"--ca-cert="/configs/security/ca/ca.crt""#));
        assert_eq!(
            commands[1],
            "unzip -o -q /opt/bench/install/a/node-cert.zip -d /opt/bench/install/a/config/security"
        );
    }

    #[tokio::test]
    async fn test_certutil_failure_reports_exit_code() {
        let executor = MockExecutor::new().fail_on("opensearch-certutil", 2);
        let host = Host::new("a", "10.0.0.1");
        let vars = variables();
        let active = vec![COMPONENT.to_string()];

        let err = InstallCertificates::new(None)
            .invoke(&ctx(&active, &vars, &host, &executor))
            .await
            .unwrap_err();

        match err {
            CoreError::Setup { component, message } => {
                assert_eq!(component, COMPONENT);
                assert!(message.contains("opensearch-certutil has exited with code [2]"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // nothing is unpacked after a failed certutil run
        assert!(!executor.commands().iter().any(|c| c.starts_with("unzip")));
    }

    #[tokio::test]
    async fn test_add_benchmark_user_defaults() {
        let executor = MockExecutor::new();
        let host = Host::new("a", "10.0.0.1");
        let vars = variables();
        let active = vec![COMPONENT.to_string()];

        assert!(AddBenchmarkUser
            .invoke(&ctx(&active, &vars, &host, &executor))
            .await
            .unwrap());
        assert_eq!(
            executor.commands(),
            vec![
                r#"/opt/bench/install/a/bin/opensearch-users useradd benchmark -p "benchmark-password""#,
                "/opt/bench/install/a/bin/opensearch-users roles benchmark -a superuser",
            ]
        );
    }
}
