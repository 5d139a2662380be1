//! [`PinataChannel`] — snapshot pinned to IPFS through the Pinata API.
//!
//! Save uploads the blob with `pinFileToIPFS`, records the returned CID in
//! the [`CidRegistry`], then unpins the previous CID so exactly one backup
//! stays pinned. Restore resolves the latest CID and downloads it through
//! public gateways, trying several URL shapes because a CID may address
//! either the file itself or a folder wrapping it.

use std::time::Duration;

use bhulekh_codec::looks_like_ciphertext;
use reqwest::blocking::{Client, multipart};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::{
  CidRegistry, Error, Result,
  channel::{BackupChannel, BackupMeta, SNAPSHOT_FILENAME},
};

const PIN_URL: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";
const UNPIN_URL: &str = "https://api.pinata.cloud/pinning/unpin";
const PIN_LIST_URL: &str = "https://api.pinata.cloud/data/pinList";

/// Metadata keyvalues identifying our pins in a shared Pinata account.
const PROJECT_TAG: &str = "bhulekh";
const BACKUP_TYPE_TAG: &str = "ledger_backup";

const DEFAULT_GATEWAYS: &[&str] = &[
  "https://gateway.pinata.cloud",
  "https://ipfs.io",
  "https://dweb.link",
];

/// Bodies smaller than this are gateway error pages, not backups.
const MIN_DOWNLOAD_BYTES: usize = 1000;

#[derive(Debug, Deserialize)]
struct PinResponse {
  #[serde(rename = "IpfsHash")]
  ipfs_hash: String,
}

#[derive(Debug, Deserialize)]
struct PinListResponse {
  rows: Vec<PinListRow>,
}

#[derive(Debug, Deserialize)]
struct PinListRow {
  ipfs_pin_hash: String,
  #[serde(default)]
  date_pinned:   String,
}

pub struct PinataChannel {
  api_key:    String,
  secret_key: String,
  gateways:   Vec<String>,
  client:     Client,
  cids:       CidRegistry,
}

impl PinataChannel {
  /// Build a channel from API credentials. Fails fast when either key is
  /// missing so a misconfigured deployment is caught at startup, not at
  /// the first backup.
  pub fn new(
    api_key: impl Into<String>,
    secret_key: impl Into<String>,
    cids: CidRegistry,
    gateways: Vec<String>,
  ) -> Result<Self> {
    let api_key = api_key.into();
    let secret_key = secret_key.into();
    if api_key.is_empty() || secret_key.is_empty() {
      return Err(Error::NotConfigured("Pinata API credentials"));
    }
    let gateways = if gateways.is_empty() {
      DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect()
    } else {
      gateways
    };
    Ok(Self {
      api_key,
      secret_key,
      gateways,
      client: Client::builder().timeout(Duration::from_secs(60)).build()?,
      cids,
    })
  }

  /// Resolve the CID to restore from: environment override, then the
  /// Pinata pin-list, then the local history/plain files.
  fn resolve_cid(&self) -> Option<String> {
    if let Some(cid) = self.cids.from_env() {
      info!(%cid, "restore CID forced via environment");
      return Some(cid);
    }
    if let Some(cid) = self.latest_pinned_cid() {
      debug!(%cid, "restore CID found via Pinata pin list");
      return Some(cid);
    }
    self.cids.from_history().or_else(|| self.cids.from_file())
  }

  /// Newest pin carrying our metadata tags, straight from the Pinata API.
  fn latest_pinned_cid(&self) -> Option<String> {
    let filter = json!({
      "type":    { "value": BACKUP_TYPE_TAG, "op": "eq" },
      "project": { "value": PROJECT_TAG,     "op": "eq" },
    })
    .to_string();

    let response = self
      .client
      .get(PIN_LIST_URL)
      .header("pinata_api_key", &self.api_key)
      .header("pinata_secret_api_key", &self.secret_key)
      .query(&[("metadata[keyvalues]", filter.as_str()), ("pageLimit", "10")])
      .send()
      .ok()?;
    if !response.status().is_success() {
      warn!(status = %response.status(), "Pinata pin list query failed");
      return None;
    }

    let mut list: PinListResponse = response.json().ok()?;
    list.rows.sort_by(|a, b| b.date_pinned.cmp(&a.date_pinned));
    list.rows.into_iter().next().map(|row| row.ipfs_pin_hash)
  }

  fn unpin(&self, cid: &str) {
    let result = self
      .client
      .delete(format!("{UNPIN_URL}/{cid}"))
      .header("pinata_api_key", &self.api_key)
      .header("pinata_secret_api_key", &self.secret_key)
      .send();
    match result {
      Ok(response) if response.status().is_success() => {
        info!(%cid, "unpinned superseded backup");
      }
      Ok(response) => {
        warn!(%cid, status = %response.status(), "could not unpin old backup");
      }
      Err(error) => warn!(%cid, %error, "could not unpin old backup"),
    }
  }

  /// Download a CID, trying each URL shape across every gateway. A body is
  /// accepted only if it is large enough and shaped like our ciphertext;
  /// gateways answer unknown paths with HTML error pages and HTTP 200.
  fn download(&self, cid: &str) -> Result<String> {
    let shapes = [
      format!("/ipfs/{cid}/{SNAPSHOT_FILENAME}"),
      format!("/ipfs/{cid}?format=raw"),
      format!("/ipfs/{cid}"),
    ];

    for shape in &shapes {
      for gateway in &self.gateways {
        let url = format!("{gateway}{shape}");
        debug!(%url, "trying gateway");
        let response = match self
          .client
          .get(&url)
          .header("Accept", "application/octet-stream, */*")
          .send()
        {
          Ok(response) => response,
          Err(error) => {
            warn!(%url, %error, "gateway request failed");
            continue;
          }
        };
        if !response.status().is_success() {
          debug!(%url, status = %response.status(), "gateway miss");
          continue;
        }
        let body = match response.text() {
          Ok(body) => body,
          Err(error) => {
            warn!(%url, %error, "could not read gateway response");
            continue;
          }
        };
        if body.len() < MIN_DOWNLOAD_BYTES {
          debug!(%url, bytes = body.len(), "response too small, skipping");
          continue;
        }
        if !looks_like_ciphertext(&body) {
          debug!(%url, "response is not ciphertext (HTML error page?)");
          continue;
        }
        info!(%url, bytes = body.len(), "downloaded snapshot from gateway");
        return Ok(body);
      }
    }

    Err(Error::UnusableBlob(format!(
      "no gateway returned a usable blob for CID {cid}"
    )))
  }
}

impl BackupChannel for PinataChannel {
  fn name(&self) -> &'static str { "pinata" }

  fn save(&self, blob: &str, meta: &BackupMeta) -> Result<()> {
    let metadata = json!({
      "name": meta.display_name,
      "keyvalues": {
        "project":   PROJECT_TAG,
        "type":      BACKUP_TYPE_TAG,
        "timestamp": meta.created_at,
      },
    });

    let form = multipart::Form::new()
      .text("pinataMetadata", metadata.to_string())
      .part(
        "file",
        multipart::Part::text(blob.to_string()).file_name(meta.filename.clone()),
      );

    let response = self
      .client
      .post(PIN_URL)
      .header("pinata_api_key", &self.api_key)
      .header("pinata_secret_api_key", &self.secret_key)
      .multipart(form)
      .send()?;

    if !response.status().is_success() {
      let status = response.status().as_u16();
      let body = response.text().unwrap_or_default();
      return Err(Error::UploadFailed { status, body });
    }

    let pin: PinResponse = response.json()?;
    info!(cid = %pin.ipfs_hash, "snapshot pinned to IPFS");

    // Remember the old CID before overwriting, then unpin it so only one
    // backup stays pinned on the account. The environment override is
    // deliberately ignored here; it names a restore point, not our pin.
    let old_cid = self.cids.from_history().or_else(|| self.cids.from_file());
    self.cids.record(&pin.ipfs_hash)?;
    if let Some(old) = old_cid
      && old != pin.ipfs_hash
    {
      self.unpin(&old);
    }
    Ok(())
  }

  fn load_latest(&self) -> Result<Option<String>> {
    let Some(cid) = self.resolve_cid() else {
      return Ok(None);
    };
    self.download(&cid).map(Some)
  }
}
