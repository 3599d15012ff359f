/*
 * Licensed to the Apache Software Foundation (ASF) under one or more
 * contributor license agreements.  See the NOTICE file distributed with
 * this work for additional information regarding copyright ownership.
 * The ASF licenses this file to You under the Apache License, Version 2.0
 * (the "License"); you may not use this file except in compliance with
 * the License.  You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::{io, sync::Arc};

use bytes::{BufMut, Bytes, BytesMut};
use dashmap::DashMap;
use flate2::{
    read::{DeflateDecoder, DeflateEncoder, GzDecoder, GzEncoder},
    Compression,
};
use lazy_static::lazy_static;

pub const GZIP: &str = "gzip";
pub const DEFLATE: &str = "deflate";

/// A named body compressor. The id travels with the message so the
/// receiving side knows how to inflate it.
pub trait Compressor: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn compress(&self, src: &[u8]) -> Result<Bytes, io::Error>;

    fn decompress(&self, src: &[u8]) -> Result<Bytes, io::Error>;
}

pub type BoxCompressor = Arc<dyn Compressor>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionEncoding {
    Gzip,
    Deflate,
}

lazy_static! {
    static ref COMPRESSIONS: DashMap<String, BoxCompressor> = {
        let map: DashMap<String, BoxCompressor> = DashMap::new();
        map.insert(GZIP.to_string(), Arc::new(CompressionEncoding::Gzip));
        map.insert(DEFLATE.to_string(), Arc::new(CompressionEncoding::Deflate));
        map
    };
}

pub fn register_compressor(compressor: BoxCompressor) -> Option<BoxCompressor> {
    COMPRESSIONS.insert(compressor.id().to_ascii_lowercase(), compressor)
}

pub fn get_compressor(id: &str) -> Option<BoxCompressor> {
    COMPRESSIONS
        .get(&id.trim().to_ascii_lowercase())
        .map(|entry| entry.value().clone())
}

impl Compressor for CompressionEncoding {
    fn id(&self) -> &str {
        match self {
            CompressionEncoding::Gzip => GZIP,
            CompressionEncoding::Deflate => DEFLATE,
        }
    }

    fn compress(&self, src: &[u8]) -> Result<Bytes, io::Error> {
        let mut dst = BytesMut::with_capacity(src.len() / 2 + 16);
        let mut dst_writer = (&mut dst).writer();

        match self {
            CompressionEncoding::Gzip => {
                let mut en = GzEncoder::new(src, Compression::default());
                io::copy(&mut en, &mut dst_writer)?;
            }
            CompressionEncoding::Deflate => {
                let mut en = DeflateEncoder::new(src, Compression::default());
                io::copy(&mut en, &mut dst_writer)?;
            }
        }

        Ok(dst.freeze())
    }

    fn decompress(&self, src: &[u8]) -> Result<Bytes, io::Error> {
        let mut dst = BytesMut::with_capacity(src.len() * 2);
        let mut dst_writer = (&mut dst).writer();

        match self {
            CompressionEncoding::Gzip => {
                let mut de = GzDecoder::new(src);
                io::copy(&mut de, &mut dst_writer)?;
            }
            CompressionEncoding::Deflate => {
                let mut de = DeflateDecoder::new(src);
                io::copy(&mut de, &mut dst_writer)?;
            }
        }

        Ok(dst.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress() {
        let src = b"test compress test compress test compress test compress".repeat(8);

        for id in [GZIP, DEFLATE] {
            let compressor = get_compressor(id).unwrap();
            let packed = compressor.compress(&src).unwrap();
            assert!(packed.len() < src.len(), "{} did not shrink the input", id);
            assert_eq!(&compressor.decompress(&packed).unwrap()[..], &src[..]);
        }
    }

    #[test]
    fn test_corrupt_input() {
        let gzip = CompressionEncoding::Gzip;
        assert!(gzip.decompress(b"definitely not gzip").is_err());
    }

    #[test]
    fn test_unknown_id() {
        assert!(get_compressor("lz4-unregistered").is_none());
        assert_eq!(get_compressor(" GZIP ").unwrap().id(), GZIP);
    }
}
