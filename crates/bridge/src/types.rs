//! Wire types exchanged with the page side of the relay.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, ChainId};
use serde::{Deserialize, Serialize};
use sextant_provider::ProviderEvent;
use uuid::Uuid;

/// A wallet call in EIP-1193 `request({method, params})` form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub(crate) enum WalletCall {
    #[serde(rename = "eth_requestAccounts")]
    RequestAccounts,

    #[serde(rename = "eth_getBalance")]
    GetBalance(Address, BlockNumberOrTag),
}

// === impl WalletCall ===

impl WalletCall {
    /// The EIP-1193 method name, for logging.
    pub(crate) fn method(&self) -> &'static str {
        match self {
            Self::RequestAccounts => "eth_requestAccounts",
            Self::GetBalance(..) => "eth_getBalance",
        }
    }
}

/// A queued wallet call the page executes on behalf of the native side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireRequest {
    /// Unique ID for tracking in the page.
    pub id: Uuid,
    #[serde(flatten)]
    pub call: WalletCall,
}

/// The page's answer to a [`WireRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireResponse {
    pub id: Uuid,
    /// JSON value the wallet returned, absent on failure.
    pub result: Option<serde_json::Value>,
    /// EIP-1193 error object, absent on success.
    pub error: Option<WireError>,
}

/// Error object of a failed wallet call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireError {
    pub code: i64,
    pub message: String,
}

/// A provider notification forwarded by the page.
///
/// Chain ids arrive the way wallets emit them: a `0x` hex quantity string, a
/// decimal string, or a plain number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub(crate) enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainIdQuantity),
}

impl From<WalletEvent> for ProviderEvent {
    fn from(event: WalletEvent) -> Self {
        match event {
            WalletEvent::AccountsChanged(accounts) => Self::AccountsChanged(accounts),
            WalletEvent::ChainChanged(chain_id) => Self::ChainChanged(chain_id.0),
        }
    }
}

/// Chain id in wallet quantity form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChainIdQuantity(pub ChainId);

impl Serialize for ChainIdQuantity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", self.0))
    }
}

impl<'de> Deserialize<'de> for ChainIdQuantity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(ChainId),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(id) => Ok(Self(id)),
            Raw::Text(text) => {
                let text = text.trim();
                let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    Some(hex) => ChainId::from_str_radix(hex, 16),
                    None => text.parse(),
                };
                parsed.map(Self).map_err(serde::de::Error::custom)
            }
        }
    }
}

/// Response envelope of the relay's HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApiResponse<T> {
    Ok(T),
    Err { message: String },
}

// === impl ApiResponse ===

impl<T> ApiResponse<T> {
    pub(crate) fn err(message: impl Into<String>) -> Self {
        Self::Err { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    #[test]
    fn wire_request_shape() {
        let request = WireRequest { id: Uuid::new_v4(), call: WalletCall::RequestAccounts };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "eth_requestAccounts");
        assert!(value.get("params").is_none());

        let request = WireRequest {
            id: Uuid::new_v4(),
            call: WalletCall::GetBalance(
                address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
                BlockNumberOrTag::Latest,
            ),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "eth_getBalance");
        assert_eq!(value["params"][1], "latest");
    }

    #[test]
    fn chain_id_quantity_forms() {
        let parse = |v: serde_json::Value| {
            serde_json::from_value::<WalletEvent>(json!({"event": "chainChanged", "payload": v}))
        };

        for payload in [json!("0x89"), json!("137"), json!(137)] {
            let WalletEvent::ChainChanged(id) = parse(payload).unwrap() else {
                panic!("expected chainChanged")
            };
            assert_eq!(id.0, 137);
        }

        assert!(parse(json!("not-a-chain")).is_err());
    }

    #[test]
    fn event_converts_to_provider_form() {
        let wire: WalletEvent = serde_json::from_value(json!({
            "event": "accountsChanged",
            "payload": ["0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"],
        }))
        .unwrap();
        let event = ProviderEvent::from(wire);
        assert_eq!(
            event,
            ProviderEvent::AccountsChanged(vec![address!(
                "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            )])
        );
    }
}
