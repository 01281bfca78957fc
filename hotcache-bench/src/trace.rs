// Copyright 2026 hotcache Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Binary request traces.
//!
//! A trace is a flat array of packed little-endian records:
//!
//! | field               | type  |
//! |---------------------|-------|
//! | `real_time`         | `u32` |
//! | `obj_id`            | `u64` |
//! | `obj_size`          | `u32` |
//! | `next_access_vtime` | `i64` |

use std::path::Path;

use anyhow::Context;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use hotcache_memory::prelude::Request;

/// Encoded size of one record.
pub const RECORD_SIZE: usize = 24;

/// Decode every complete record of `buf`.
///
/// A trailing partial record is ignored. With `ignore_obj_size` every object is treated as one byte.
pub fn decode(mut buf: Bytes, ignore_obj_size: bool) -> Vec<Request> {
    let trailing = buf.len() % RECORD_SIZE;
    if trailing != 0 {
        tracing::warn!(trailing, "[trace]: ignore trailing partial record");
    }

    let mut reqs = Vec::with_capacity(buf.len() / RECORD_SIZE);
    while buf.remaining() >= RECORD_SIZE {
        let _real_time = buf.get_u32_le();
        let obj_id = buf.get_u64_le();
        let obj_size = buf.get_u32_le();
        let next_access_vtime = buf.get_i64_le();
        reqs.push(Request {
            obj_id,
            obj_size: if ignore_obj_size { 1 } else { obj_size },
            next_access_vtime,
        });
    }
    reqs
}

/// Encode `reqs` with the given wall-clock timestamps.
pub fn encode(reqs: impl IntoIterator<Item = (u32, Request)>) -> Bytes {
    let mut buf = BytesMut::new();
    for (real_time, req) in reqs {
        buf.put_u32_le(real_time);
        buf.put_u64_le(req.obj_id);
        buf.put_u32_le(req.obj_size);
        buf.put_i64_le(req.next_access_vtime);
    }
    buf.freeze()
}

/// Load a trace file.
pub fn read(path: &Path, ignore_obj_size: bool) -> anyhow::Result<Vec<Request>> {
    let buf = std::fs::read(path).with_context(|| format!("failed to read trace {}", path.display()))?;
    let reqs = decode(Bytes::from(buf), ignore_obj_size);
    tracing::info!(path = %path.display(), requests = reqs.len(), "[trace]: loaded");
    Ok(reqs)
}

/// Write `reqs` as a trace file, using the request sequence number as timestamp.
pub fn write(path: &Path, reqs: &[Request]) -> anyhow::Result<()> {
    let buf = encode(reqs.iter().enumerate().map(|(i, req)| (i as u32, *req)));
    std::fs::write(path, &buf).with_context(|| format!("failed to write trace {}", path.display()))?;
    tracing::info!(path = %path.display(), requests = reqs.len(), "[trace]: written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_read_trace_file() {
        let reqs = vec![
            Request {
                obj_id: 1,
                obj_size: 4096,
                next_access_vtime: 2,
            },
            Request {
                obj_id: u64::MAX - 1,
                obj_size: 7,
                next_access_vtime: -1,
            },
        ];
        let mut encoded = encode(reqs.iter().copied().enumerate().map(|(t, r)| (t as u32, r))).to_vec();
        // Truncated record.
        encoded.extend_from_slice(&[0u8; 5]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.bin");
        std::fs::write(&path, &encoded).unwrap();

        assert_eq!(read(&path, false).unwrap(), reqs);
        let unit = read(&path, true).unwrap();
        assert!(unit.iter().all(|r| r.obj_size == 1));
        assert!(read(&dir.path().join("missing.bin"), false).is_err());

        let copy = dir.path().join("copy.bin");
        write(&copy, &reqs).unwrap();
        assert_eq!(read(&copy, false).unwrap(), reqs);
    }
}
