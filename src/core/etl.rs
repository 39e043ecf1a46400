use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::debug!("Starting ETL run");

        let raw = self.pipeline.extract().await?;
        tracing::debug!("Extracted in {:?}", started.elapsed());

        let transformed = self.pipeline.transform(raw).await?;
        tracing::debug!("Transformed in {:?}", started.elapsed());

        let output = self.pipeline.load(transformed).await?;
        tracing::debug!("ETL run finished in {:?}: {}", started.elapsed(), output);

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::WxError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPipeline {
        fail_extract: bool,
        loads: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Pipeline for CountingPipeline {
        type Raw = Vec<i32>;
        type Output = i32;

        async fn extract(&self) -> Result<Vec<i32>> {
            if self.fail_extract {
                return Err(WxError::UpstreamStatus {
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(vec![1, 2, 3])
        }

        async fn transform(&self, raw: Vec<i32>) -> Result<i32> {
            Ok(raw.iter().sum())
        }

        async fn load(&self, output: i32) -> Result<String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(format!("sum={}", output))
        }
    }

    #[tokio::test]
    async fn test_run_chains_stages() {
        let engine = EtlEngine::new(CountingPipeline {
            fail_extract: false,
            loads: AtomicUsize::new(0),
        });
        assert_eq!(engine.run().await.unwrap(), "sum=6");
        assert_eq!(engine.pipeline().loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extract_failure_skips_load() {
        let engine = EtlEngine::new(CountingPipeline {
            fail_extract: true,
            loads: AtomicUsize::new(0),
        });
        assert!(engine.run().await.is_err());
        assert_eq!(engine.pipeline().loads.load(Ordering::SeqCst), 0);
    }
}
