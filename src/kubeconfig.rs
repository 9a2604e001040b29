use anyhow::Context as _;
use kube::config::{Config, KubeConfigOptions, Kubeconfig};
use std::{convert::TryFrom, path::PathBuf};

/// Overrides for cluster client discovery.
/// Without them the pod service account is used when present, else `KUBECONFIG`.
#[derive(clap::Args, Debug, Default)]
pub struct ClusterArgs {
    /// Path to a kubeconfig file
    #[clap(long)]
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one
    #[clap(long)]
    pub context: Option<String>,
}

/// True when the service account environment of a pod is present.
pub fn in_cluster() -> bool {
    std::env::var_os("KUBERNETES_SERVICE_HOST").is_some()
        && std::env::var_os("KUBERNETES_SERVICE_PORT").is_some()
}

/// Resolves client configuration
pub async fn load_config(args: &ClusterArgs) -> anyhow::Result<Config> {
    let options = KubeConfigOptions {
        context: args.context.clone(),
        ..Default::default()
    };
    let config = match &args.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .context("failed to load kubeconfig")?
        }
        None if args.context.is_some() => Config::from_kubeconfig(&options)
            .await
            .context("failed to load kubeconfig")?,
        None => ambient_config(in_cluster(), &options).await?,
    };
    Ok(config)
}

/// Service account first when running in a pod, then the default kubeconfig.
async fn ambient_config(in_cluster: bool, options: &KubeConfigOptions) -> anyhow::Result<Config> {
    if in_cluster {
        match Config::incluster() {
            Ok(config) => return Ok(config),
            Err(err) => tracing::warn!(
                error = %err,
                "in-cluster configuration unavailable, falling back to kubeconfig"
            ),
        }
    }
    Config::from_kubeconfig(options)
        .await
        .context("failed to load kubeconfig")
}

/// Builds the client used for the whole process lifetime.
pub async fn connect(args: &ClusterArgs) -> anyhow::Result<kube::Client> {
    let config = load_config(args).await?;
    tracing::info!(
        cluster_url = %config.cluster_url,
        in_cluster = in_cluster(),
        "Connecting to kube"
    );
    kube::Client::try_from(config).context("failed to build kube client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: local
  cluster:
    server: https://127.0.0.1:6443
    insecure-skip-tls-verify: true
- name: remote
  cluster:
    server: https://10.1.2.3:443
    insecure-skip-tls-verify: true
users:
- name: bridge
  user:
    token: not-a-real-token
contexts:
- name: local
  context:
    cluster: local
    user: bridge
    namespace: lb
- name: remote
  context:
    cluster: remote
    user: bridge
current-context: local
"#;

    const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

    fn kubeconfig_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn explicit_kubeconfig_uses_current_context() {
        let file = kubeconfig_file();
        let args = ClusterArgs {
            kubeconfig: Some(file.path().to_path_buf()),
            context: None,
        };
        let config = load_config(&args).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("127.0.0.1"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
        assert_eq!(config.default_namespace, "lb");
    }

    #[tokio::test]
    async fn context_override() {
        let file = kubeconfig_file();
        let args = ClusterArgs {
            kubeconfig: Some(file.path().to_path_buf()),
            context: Some("remote".to_string()),
        };
        let config = load_config(&args).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("10.1.2.3"));
    }

    #[tokio::test]
    async fn missing_service_account_falls_back_to_kubeconfig() {
        if std::path::Path::new(SERVICE_ACCOUNT_TOKEN).exists() {
            return;
        }
        let file = kubeconfig_file();
        std::env::set_var("KUBECONFIG", file.path());
        let config = ambient_config(true, &KubeConfigOptions::default())
            .await
            .unwrap();
        assert_eq!(config.cluster_url.host(), Some("127.0.0.1"));
        assert_eq!(config.default_namespace, "lb");
    }

    #[tokio::test]
    async fn unreadable_kubeconfig_is_an_error() {
        let args = ClusterArgs {
            kubeconfig: Some(PathBuf::from("/nonexistent/kubeconfig")),
            context: None,
        };
        assert!(load_config(&args).await.is_err());
    }
}
