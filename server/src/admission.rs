//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
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

//! Connection admission control

/// Decide whether a new connection may be accepted.
///
/// `current_total` counts every tracked client, authenticated or not. A limit of
/// zero rejects everything.
pub fn is_allowed(current_total: usize, max_connections: usize) -> bool {
    max_connections != 0 && current_total < max_connections
}
