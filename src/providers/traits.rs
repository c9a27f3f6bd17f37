use async_trait::async_trait;

/// A chat-completion backend.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, message: &str, model: &str, temperature: f64) -> anyhow::Result<String> {
        self.chat_with_system(None, message, model, temperature)
            .await
    }

    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String>;

    /// Warm up the HTTP connection pool (TLS handshake, DNS).
    /// Default implementation is a no-op.
    async fn warmup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Provider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat_with_system(
            &self,
            system_prompt: Option<&str>,
            message: &str,
            _model: &str,
            _temperature: f64,
        ) -> anyhow::Result<String> {
            Ok(format!("{}|{message}", system_prompt.unwrap_or("-")))
        }
    }

    #[tokio::test]
    async fn chat_defaults_to_no_system_prompt() {
        let p = Echo;
        assert_eq!(p.chat("hi", "m", 0.0).await.unwrap(), "-|hi");
        assert!(p.warmup().await.is_ok());
    }
}
