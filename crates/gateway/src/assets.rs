//! # アセットストア
//!
//! 認可済みリクエストに返す高解像度ファイルの置き場。
//! token idから`<root>/<token_id>.jpg`への決定的なマッピングだけを
//! 責務とし、ファイルの有無は認可判定とは独立したエラーとして扱う。

use std::path::PathBuf;

use crate::error::GatewayError;

/// ファイル拡張子は固定。
const ASSET_EXTENSION: &str = "jpg";

/// ローカルディレクトリ上のアセットストア。
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// token idに対応するファイルパスを返す。
    pub fn path_for(&self, token_id: u64) -> PathBuf {
        self.root.join(format!("{token_id}.{ASSET_EXTENSION}"))
    }

    /// クライアントに提示するダウンロードファイル名。
    pub fn filename_for(&self, token_id: u64) -> String {
        format!("{token_id}.{ASSET_EXTENSION}")
    }

    /// アセットファイルを読み出す。
    ///
    /// 存在しない場合は`AssetNotFound`（404）、それ以外のI/O失敗は
    /// `Internal`（500）。403と混ざらない独立したエラー系統。
    pub async fn fetch(&self, token_id: u64) -> Result<Vec<u8>, GatewayError> {
        let path = self.path_for(token_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(GatewayError::AssetNotFound(token_id))
            }
            Err(e) => Err(GatewayError::Internal(format!(
                "failed to read asset {}: {e}",
                path.display()
            ))),
        }
    }
}
