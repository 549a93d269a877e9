//! # Photon 署名プロトコル
//!
//! 署名鍵の導出と署名付きURLのエンコード・デコード・検証を実装する。
//!
//! ## 暗号アルゴリズム
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 鍵導出 | HMAC-SHA256(master_secret, identity) |
//! | URL署名 | HMAC-SHA256(導出鍵, 正準文字列) |
//! | MAC比較 | 定数時間比較（`Mac::verify_slice`） |
//!
//! 検証鍵は保存されず、`(master_secret, identity)`から毎回再導出する。
//! 導出は一方向であるため、導出鍵が漏洩してもマスターシークレットや
//! 他の認証主体の鍵は復元できない。

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use photon_types::{
    ImageFormat, ImageSignature, ImageSize, SignaturePayload, SignerIdentity, SigningKey,
};

type HmacSha256 = Hmac<Sha256>;

/// Base64エンジン（Standard）。MACと導出鍵の転送表現に使用。
pub fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// Base64エンジン（URL-safe, パディングなし）。署名ペイロードに使用。
pub fn b64url() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
}

/// 署名デコード・検証のエラー型。
/// 不正入力はすべてこの型に閉じ込め、コーデック境界の外へpanicを漏らさない。
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Base64またはJSONとしてデコードできない
    #[error("署名ペイロードをデコードできません: {0}")]
    Undecodable(String),
    /// 有効期限切れ（expires_at <= 検証時刻）
    #[error("署名の有効期限が切れています")]
    Expired,
    /// user_id / share_token のいずれも存在しない
    #[error("認証主体がありません")]
    NoCredential,
    /// user_id / share_token の両方が存在する
    #[error("認証主体が複数指定されています")]
    AmbiguousCredential,
}

/// 導出済み署名鍵のバイト列（HMAC-SHA256出力、32バイト）。
pub type DerivedKey = [u8; 32];

// ---------------------------------------------------------------------------
// 鍵導出
// ---------------------------------------------------------------------------

/// `(master_secret, identity)`から署名鍵を決定論的に導出する。
/// 純粋関数であり、同一入力は常に同一の鍵を返す。
pub fn derive_signing_key(master_secret: &[u8], identity: &str) -> DerivedKey {
    let mut mac = HmacSha256::new_from_slice(master_secret)
        .expect("HMAC-SHA256は任意長の鍵を受け付ける");
    mac.update(identity.as_bytes());
    mac.finalize().into_bytes().into()
}

/// 署名鍵を導出し、転送用の`SigningKey`として発行する。
/// 鍵は永続化されず、有効期間内であれば同じ入力から再構築できる。
pub fn issue_signing_key(
    master_secret: &[u8],
    identity: SignerIdentity,
    ttl_secs: i64,
    now: i64,
) -> SigningKey {
    let key_bytes = derive_signing_key(master_secret, identity.as_str());
    SigningKey {
        key: b64().encode(key_bytes),
        expires_at: now + ttl_secs,
        identity,
    }
}

// ---------------------------------------------------------------------------
// 正準署名文字列
// ---------------------------------------------------------------------------

/// HMACの署名対象となる正準文字列を構築する。
/// 発行側と検証側がバイト単位で一致する必要がある。
/// 各フィールドは閉じた列挙型か不透明IDであるためエスケープは不要。
pub fn canonical_signing_string(
    library_id: &str,
    photo_id: &str,
    size: ImageSize,
    format: ImageFormat,
    expires_at: i64,
) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        library_id,
        photo_id,
        size.as_str(),
        format.as_str(),
        expires_at
    )
}

/// 導出鍵で正準文字列のMACを計算する。
pub fn compute_mac(master_secret: &[u8], identity: &str, canonical: &str) -> Vec<u8> {
    let key = derive_signing_key(master_secret, identity);
    let mut mac = HmacSha256::new_from_slice(&key)
        .expect("HMAC-SHA256は任意長の鍵を受け付ける");
    mac.update(canonical.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// MACを計算し、Base64（Standard）でエンコードして返す。発行側で使用。
pub fn compute_mac_b64(master_secret: &[u8], identity: &str, canonical: &str) -> String {
    b64().encode(compute_mac(master_secret, identity, canonical))
}

// ---------------------------------------------------------------------------
// 署名ペイロードのエンコード・デコード
// ---------------------------------------------------------------------------

/// 署名ペイロードをBase64urlトークンへエンコードする。
pub fn encode_signature(payload: &SignaturePayload) -> Result<String, SignatureError> {
    let json = serde_json::to_vec(payload)
        .map_err(|e| SignatureError::Undecodable(format!("シリアライズに失敗: {e}")))?;
    Ok(b64url().encode(json))
}

/// Base64urlトークンをデコードし、署名として妥当か検査する。
///
/// 以下はすべてエラーとして返し、panicしない:
/// - Base64url / JSONとしてデコードできない
/// - size / format が列挙型に含まれない（JSONパースで拒否される）
/// - `expires_at <= now`（境界値は期限切れ扱い）
/// - 認証主体が0個または2個
pub fn decode_signature(token: &str, now: i64) -> Result<ImageSignature, SignatureError> {
    let raw = b64url()
        .decode(token)
        .map_err(|e| SignatureError::Undecodable(format!("Base64urlデコードに失敗: {e}")))?;
    let payload: SignaturePayload = serde_json::from_slice(&raw)
        .map_err(|e| SignatureError::Undecodable(format!("JSONパースに失敗: {e}")))?;

    if payload.expires_at <= now {
        return Err(SignatureError::Expired);
    }

    let identity = match (payload.user_id, payload.share_token) {
        (Some(user_id), None) => SignerIdentity::User(user_id),
        (None, Some(token)) => SignerIdentity::Share(token),
        (None, None) => return Err(SignatureError::NoCredential),
        (Some(_), Some(_)) => return Err(SignatureError::AmbiguousCredential),
    };

    Ok(ImageSignature {
        library_id: payload.library_id,
        photo_id: payload.photo_id,
        size: payload.size,
        format: payload.format,
        expires_at: payload.expires_at,
        identity,
    })
}

// ---------------------------------------------------------------------------
// MAC検証
// ---------------------------------------------------------------------------

/// デコード済み署名に対して提示されたMACを検証する。
///
/// 正準文字列を再構築し、認証主体の鍵を再導出して期待MACを計算し、
/// 定数時間比較を行う。提示MACがBase64としてデコードできない場合や
/// 長さが一致しない場合は、エラーではなく不一致（false）として扱う。
pub fn verify_mac(
    master_secret: &[u8],
    signature: &ImageSignature,
    provided_mac_b64: &str,
) -> bool {
    let provided = match b64().decode(provided_mac_b64) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let canonical = canonical_signing_string(
        &signature.library_id,
        &signature.photo_id,
        signature.size,
        signature.format,
        signature.expires_at,
    );

    let key = derive_signing_key(master_secret, signature.identity.as_str());
    let mut mac = HmacSha256::new_from_slice(&key)
        .expect("HMAC-SHA256は任意長の鍵を受け付ける");
    mac.update(canonical.as_bytes());

    // verify_sliceは長さ不一致を含めて定数時間で不一致を返す
    mac.verify_slice(&provided).is_ok()
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
