use std::path::Path;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use tokio::io::AsyncWriteExt;
use tokio::runtime::Runtime;

use super::{StoreClient, StoreConfig, commit_part};
use crate::error::{ConfigError, TransferError};
use crate::paths::part_path;

/// S3 (or S3-compatible) store. Owns its own tokio runtime so each worker
/// thread can drive a request to completion with a blocking call.
pub struct S3Store {
    client: Client,
    runtime: Runtime,
}

impl S3Store {
    pub fn connect(config: &StoreConfig) -> Result<Self, ConfigError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("imgpull-s3")
            .build()
            .map_err(|e| ConfigError::Store(format!("cannot start async runtime: {}", e)))?;
        let client = runtime.block_on(build_client(config));
        tracing::info!(
            "s3 client ready: region={} profile={:?} endpoint={:?}",
            config.region,
            config.profile,
            config.endpoint_url
        );
        Ok(Self { client, runtime })
    }
}

async fn build_client(config: &StoreConfig) -> Client {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    if let Some(creds) = &config.credentials {
        loader = loader.credentials_provider(Credentials::new(
            &creds.access_key_id,
            &creds.secret_access_key,
            None,
            None,
            "imgpull-static",
        ));
    } else if let Some(profile) = &config.profile {
        loader = loader.profile_name(profile);
    }
    let shared = loader.load().await;

    let mut builder = S3ConfigBuilder::from(&shared);
    if let Some(endpoint_url) = &config.endpoint_url {
        builder = builder.endpoint_url(endpoint_url);
    }
    if config.force_path_style {
        builder = builder.force_path_style(true);
    }
    Client::from_conf(builder.build())
}

impl StoreClient for S3Store {
    fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), TransferError> {
        let part = part_path(dest);
        match self.runtime.block_on(download_to(&self.client, bucket, key, &part)) {
            Ok(bytes) => {
                tracing::debug!("s3 fetched {} ({} bytes)", key, bytes);
                commit_part(&part, dest)
            }
            Err(e) => {
                let _ = std::fs::remove_file(&part);
                Err(e)
            }
        }
    }
}

async fn download_to(
    client: &Client,
    bucket: &str,
    key: &str,
    part: &Path,
) -> Result<u64, TransferError> {
    let resp =
        client.get_object().bucket(bucket).key(key).send().await.map_err(|e| classify(key, e))?;
    let mut body = resp.body;
    let mut file =
        tokio::fs::File::create(part).await.map_err(|e| TransferError::local_write(part, e))?;
    let mut written = 0u64;
    while let Some(chunk) = body.try_next().await.map_err(|e| {
        TransferError::NetworkFailure(format!("{}: {}", key, DisplayErrorContext(&e)))
    })? {
        file.write_all(&chunk).await.map_err(|e| TransferError::local_write(part, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| TransferError::local_write(part, e))?;
    Ok(written)
}

fn classify<R>(key: &str, err: SdkError<GetObjectError, R>) -> TransferError
where
    R: std::fmt::Debug + 'static,
{
    if let Some(service) = err.as_service_error()
        && service.is_no_such_key()
    {
        return TransferError::NotFoundInStore(key.to_string());
    }
    TransferError::NetworkFailure(format!("{}: {}", key, DisplayErrorContext(&err)))
}
