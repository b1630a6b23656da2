//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::transport::{Transport, TransportWrapper};

/// A pass-through transport.
///
/// Every operation goes to the wrapped transport unchanged. Useful as a
/// layering point, or as the field type of a larger wrapper.
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::{MemoryTransport, Transport, WrappedTransport};
///
/// let (a, b) = MemoryTransport::pair();
/// let a = WrappedTransport::new(a);
///
/// a.begin_write(4).unwrap();
/// a.write(b"layered").unwrap();
/// a.end_write().unwrap();
///
/// assert_eq!(b.begin_read().unwrap(), 4);
/// b.end_read().unwrap();
/// ```
#[derive(Debug)]
pub struct WrappedTransport<T> {
    inner: T,
}

impl<T: Transport> WrappedTransport<T> {
    /// Wraps `inner`.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Returns the wrapped transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> TransportWrapper for WrappedTransport<T> {
    type Inner = T;

    fn inner(&self) -> &T {
        &self.inner
    }
}
