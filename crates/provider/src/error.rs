// This file is part of Barge.
//
// Barge is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Barge is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Barge.
// If not, see https://www.gnu.org/licenses/.

use alloy_primitives::Bytes;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors returned by provider operations
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A call reverted, carrying the raw revert payload for typed decoding
    #[error("execution reverted")]
    Revert(Bytes),
    /// Error from the RPC transport or node
    #[error("rpc error: {0}")]
    Rpc(String),
    /// Any other provider error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
