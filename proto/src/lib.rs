//! Wire protocol between a match session and its clients
//!
//! Uses postcard for efficient binary serialization. Sides are encoded as
//! `0 = top`, `1 = bottom`.

use postcard::{from_bytes, to_allocvec};

/// Encode/decode failure
pub use postcard::Error as WireError;

pub const SIDE_TOP: u8 = 0;
pub const SIDE_BOTTOM: u8 = 1;

// ============================================================================
// C2S Messages (Client to Server)
// ============================================================================

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum C2S {
    /// Paddle input for a human side: held direction keys
    /// seq: client-side sequence number, echoed in logs only
    Input {
        side: u8,
        left: bool,
        right: bool,
        seq: u32,
    },

    /// Ping for latency measurement
    Ping { t_ms: u32 },
}

// ============================================================================
// S2C Messages (Server to Client)
// ============================================================================

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum S2C {
    /// Game state snapshot
    GameState {
        tick: u32,
        ball_x: f32,
        ball_y: f32,
        ball_vx: f32,
        ball_vy: f32,
        paddle_top_x: f32,
        paddle_bottom_x: f32,
        score_top: u8,
        score_bottom: u8,
    },

    /// A point was scored this tick
    PointScored {
        scorer: u8,
        score_top: u8,
        score_bottom: u8,
    },

    /// Game over message
    GameOver { winner: u8 },

    /// Pong response to ping
    Pong { t_ms: u32 },
}

// ============================================================================
// Encoding
// ============================================================================

/// Postcard framing shared by both message directions
pub trait Wire: serde::Serialize + serde::de::DeserializeOwned {
    fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        to_allocvec(self)
    }

    /// Trailing bytes after a complete message are ignored
    fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        from_bytes(bytes)
    }
}

impl Wire for C2S {}
impl Wire for S2C {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_decodes_as_sent() {
        let msg = C2S::Input {
            side: SIDE_BOTTOM,
            left: true,
            right: false,
            seq: 1,
        };
        let bytes = msg.to_bytes().unwrap();
        assert_eq!(C2S::from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_point_then_game_over() {
        let stream = [
            S2C::PointScored {
                scorer: SIDE_TOP,
                score_top: 11,
                score_bottom: 9,
            },
            S2C::GameOver { winner: SIDE_TOP },
        ];
        for msg in stream {
            let bytes = msg.to_bytes().unwrap();
            assert_eq!(S2C::from_bytes(&bytes).unwrap(), msg);
        }
    }

    #[test]
    fn test_snapshot_is_compact() {
        let msg = S2C::GameState {
            tick: 100,
            ball_x: 16.0,
            ball_y: 12.0,
            ball_vx: 8.0,
            ball_vy: 4.0,
            paddle_top_x: 360.0,
            paddle_bottom_x: 12.0,
            score_top: 5,
            score_bottom: 3,
        };
        let bytes = msg.to_bytes().unwrap();
        // tag + varint tick + six f32 + two scores
        assert_eq!(bytes.len(), 1 + 1 + 6 * 4 + 2);
    }

    #[test]
    fn test_garbage_rejected() {
        let bytes = S2C::GameOver { winner: SIDE_TOP }.to_bytes().unwrap();
        assert!(C2S::from_bytes(&[]).is_err());
        assert!(S2C::from_bytes(&bytes[..1]).is_err());
        assert!(C2S::from_bytes(&[9]).is_err(), "unknown variant");
    }
}
