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

#![warn(unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]

//! Entry point contract bindings used by Barge.
//!
//! Only the surface the executor decodes is bound: the user operation
//! lifecycle events and the `FailedOp` revert errors. Bundle call
//! construction happens in the low-level executor and is not bound here.

pub mod v0_6;
pub mod v0_7;
