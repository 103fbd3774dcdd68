//! 最長一致トークナイザー
//!
//! このモジュールは、語彙トライによる最長一致の`encode`と、
//! バイトフォールバック再構成を含む`decode`を提供します。
//! `encode`は純粋で決定的です。同じ語彙と入力に対しては常に同じ
//! ID列を返します。最長一致は一意なので引き分けは存在しません。

use std::io::{Read, Write};

use crate::blob::{Blob, DType};
use crate::errors::{LegatoError, Result};
use crate::trie::{Cursor, Traverse, Trie};
use crate::utf8::{extract_char, len_utf8, to_codepoint};
use crate::utils::FromU32;
use crate::vocab::{Vocabulary, EOT_ID, FALLBACK_MAX, FALLBACK_OFFSET};

/// 最長一致トークナイザー
///
/// 語彙の表層形をUTF-8バイト列のトライに展開して保持します。
pub struct Tokenizer {
    trie: Trie<u8>,
    vocab: Vocabulary,
}

impl Tokenizer {
    /// 語彙からトークナイザーを構築します
    ///
    /// # エラー
    ///
    /// 語彙が空の場合、[`LegatoError::InvalidArgument`] が返されます。
    pub fn from_vocab(vocab: Vocabulary) -> Result<Self> {
        if vocab.is_empty() {
            return Err(LegatoError::invalid_argument(
                "vocab",
                "the vocabulary must not be empty",
            ));
        }
        let mut entries: Vec<(&str, u32)> = vocab.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        let keys: Vec<&[u8]> = entries.iter().map(|(s, _)| s.as_bytes()).collect();
        let values: Vec<u32> = entries.iter().map(|(_, id)| *id).collect();
        let trie = Trie::build(&keys, &values)?;
        Ok(Self { trie, vocab })
    }

    /// 構築済みのトライと語彙からトークナイザーを復元します
    ///
    /// 永続化済みモデルの読み込み経路で使用します。トライと語彙の
    /// 整合性は呼び出し側が保証します。
    pub(crate) fn from_parts(trie: Trie<u8>, vocab: Vocabulary) -> Self {
        Self { trie, vocab }
    }

    /// 語彙への参照を返します
    #[inline(always)]
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// テキストをID列へ符号化します
    ///
    /// カーソル位置からUTF-8文字単位でトライを降下し、値を持つ最長の
    /// 一致を採用します。どの語彙にも一致しない文字は、バイト値+1の
    /// フォールバックIDの並びとして出力します。
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        self.encode_bytes(text.as_bytes())
    }

    /// バイト列をID列へ符号化します
    ///
    /// # エラー
    ///
    /// 入力が有効なUTF-8でない場合、[`LegatoError::InvalidUtf8`] が
    /// 返されます。
    pub fn encode_bytes(&self, bytes: &[u8]) -> Result<Vec<u32>> {
        let mut ids = vec![];
        let mut cursor = 0;

        while cursor < bytes.len() {
            // 1文字ずつ降下し、値を持つ最長の一致を覚えておく。
            let mut node = Cursor::ROOT;
            let mut probe_len = 0;
            let mut best: Option<(u32, usize)> = None;
            while cursor + probe_len < bytes.len() {
                let ch = extract_char(bytes, cursor + probe_len)?;
                match self.trie.traverse(node, ch) {
                    Traverse::Value { cursor: c, value } => {
                        node = c;
                        probe_len += ch.len();
                        best = Some((value, probe_len));
                    }
                    Traverse::Prefix { cursor: c } => {
                        node = c;
                        probe_len += ch.len();
                    }
                    Traverse::Fail { .. } => break,
                }
            }

            match best {
                Some((id, len)) => {
                    ids.push(id);
                    cursor += len;
                }
                None => {
                    // 一致なし。カーソル位置の1文字をバイトフォールバックする。
                    let ch = extract_char(bytes, cursor)?;
                    for &b in ch {
                        ids.push(u32::from(b) + FALLBACK_OFFSET);
                    }
                    cursor += ch.len();
                }
            }
        }
        Ok(ids)
    }

    /// ID列をテキストへ復号します
    ///
    /// フォールバック範囲のIDは、1つのUTF-8文字を構成する最小個数
    /// （1〜4個）をまとめて消費します。テキスト終端ID（0）は何も
    /// 出力しません。
    ///
    /// # エラー
    ///
    /// * [`LegatoError::InvalidFallbackSequence`] - フォールバックIDの
    ///   並びがUTF-8文字を再構成しない場合
    /// * [`LegatoError::UnknownId`] - 語彙に存在しないIDの場合
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        let mut out = String::new();
        let mut i = 0;
        while i < ids.len() {
            let id = ids[i];
            if id == EOT_ID {
                i += 1;
                continue;
            }
            if id <= FALLBACK_MAX {
                let lead = (id - FALLBACK_OFFSET) as u8;
                let len = len_utf8(lead);
                if len == 0 || i + len > ids.len() {
                    return Err(LegatoError::InvalidFallbackSequence { position: i });
                }
                let mut buf = [0u8; 4];
                for (k, slot) in buf[..len].iter_mut().enumerate() {
                    let b = ids[i + k];
                    if !(FALLBACK_OFFSET..=FALLBACK_MAX).contains(&b) {
                        return Err(LegatoError::InvalidFallbackSequence { position: i + k });
                    }
                    *slot = (b - FALLBACK_OFFSET) as u8;
                }
                let (cp, _) = to_codepoint(&buf[..len])
                    .map_err(|_| LegatoError::InvalidFallbackSequence { position: i })?;
                let c = char::from_u32(cp)
                    .ok_or(LegatoError::InvalidFallbackSequence { position: i })?;
                out.push(c);
                i += len;
            } else {
                match self.vocab.surface(id) {
                    Some(surface) => out.push_str(surface),
                    None => return Err(LegatoError::UnknownId { id }),
                }
                i += 1;
            }
        }
        Ok(out)
    }

    /// トークナイザーをブロブとして書き出します。
    ///
    /// 領域は、シリアライズ済みトライ（`trie`）、表層文字列の連結
    /// （`surfaces`）、各表層の終端オフセット（`surface_offsets`）、
    /// 対応する語彙ID（`surface_ids`）です。
    pub fn write<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        let mut trie_bytes = vec![];
        self.trie.serialize(&mut trie_bytes)?;

        let mut entries: Vec<(&str, u32)> = self.vocab.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let mut surfaces: Vec<u8> = vec![];
        let mut offsets: Vec<u8> = vec![];
        let mut ids: Vec<u8> = vec![];
        for (surface, id) in &entries {
            surfaces.extend(surface.as_bytes());
            offsets.extend((surfaces.len() as u32).to_le_bytes());
            ids.extend(id.to_le_bytes());
        }

        let mut blob = Blob::new();
        blob.add_region("trie", DType::U8, &[trie_bytes.len() as u64], trie_bytes)?;
        blob.add_region("surfaces", DType::U8, &[surfaces.len() as u64], surfaces)?;
        blob.add_region(
            "surface_offsets",
            DType::U32,
            &[entries.len() as u64],
            offsets,
        )?;
        blob.add_region("surface_ids", DType::U32, &[entries.len() as u64], ids)?;
        blob.add_metadata("creator", concat!("legato ", env!("CARGO_PKG_VERSION")));
        blob.write_to(wtr)
    }

    /// ブロブからトークナイザーを復元します。
    ///
    /// トライと語彙テーブルの整合性を検証します。
    ///
    /// # エラー
    ///
    /// 領域の欠落や不整合は [`LegatoError::CorruptBlob`] になります。
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let blob = Blob::read_from(rdr)?;
        let trie_region = blob
            .region("trie")
            .ok_or_else(|| LegatoError::corrupt_blob("missing region trie"))?;
        let trie = Trie::<u8>::deserialize(trie_region.data())?;

        let surfaces = blob
            .region("surfaces")
            .ok_or_else(|| LegatoError::corrupt_blob("missing region surfaces"))?
            .data();
        let offsets = blob
            .region("surface_offsets")
            .ok_or_else(|| LegatoError::corrupt_blob("missing region surface_offsets"))?
            .as_u32();
        let ids = blob
            .region("surface_ids")
            .ok_or_else(|| LegatoError::corrupt_blob("missing region surface_ids"))?
            .as_u32();
        if offsets.len() != ids.len() {
            return Err(LegatoError::corrupt_blob(
                "surface_offsets and surface_ids differ in length",
            ));
        }

        let mut entries = Vec::with_capacity(ids.len());
        let mut start = 0usize;
        for (&end, &id) in offsets.iter().zip(&ids) {
            let end = usize::from_u32(end);
            if end < start || end > surfaces.len() {
                return Err(LegatoError::corrupt_blob("surface offsets are not increasing"));
            }
            let surface = std::str::from_utf8(&surfaces[start..end])
                .map_err(|_| LegatoError::corrupt_blob("surface is not valid UTF-8"))?;
            entries.push((surface.to_string(), id));
            start = end;
        }
        if start != surfaces.len() {
            return Err(LegatoError::corrupt_blob(
                "surface offsets do not cover the surface buffer",
            ));
        }
        let vocab = Vocabulary::from_entries(entries)
            .map_err(|e| LegatoError::corrupt_blob(e.to_string()))?;

        // トライと語彙の内容が一致することを確認する。
        for (surface, id) in vocab.iter() {
            if trie.exact_match(surface.as_bytes()) != Some(id) {
                return Err(LegatoError::corrupt_blob(format!(
                    "trie does not agree with the vocabulary for {surface:?}"
                )));
            }
        }

        Ok(Self::from_parts(trie, vocab))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(entries: &[(&str, u32)]) -> Vocabulary {
        Vocabulary::from_entries(entries.iter().map(|(s, id)| (s.to_string(), *id))).unwrap()
    }

    #[test]
    fn test_encode_longest_match() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[
            ("he", 300),
            ("hello", 301),
            ("you", 302),
            ("your", 303),
        ]))
        .unwrap();
        // "hello" が "he" より優先される。
        assert_eq!(tokenizer.encode("helloyou").unwrap(), vec![301, 302]);
        // "hell" は "he" + フォールバック l, l。
        assert_eq!(
            tokenizer.encode("hell").unwrap(),
            vec![300, u32::from(b'l') + 1, u32::from(b'l') + 1]
        );
    }

    #[test]
    fn test_encode_japanese() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[
            ("吾輩", 300),
            ("は", 301),
            ("猫", 302),
            ("である", 303),
        ]))
        .unwrap();
        assert_eq!(
            tokenizer.encode("吾輩は猫である").unwrap(),
            vec![300, 301, 302, 303]
        );
    }

    #[test]
    fn test_encode_byte_fallback() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[("a", 258)])).unwrap();
        assert_eq!(
            tokenizer.encode("a😀").unwrap(),
            vec![258, 0xF0 + 1, 0x9F + 1, 0x98 + 1, 0x80 + 1]
        );
    }

    #[test]
    fn test_decode_byte_fallback() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[("a", 258)])).unwrap();
        let ids = tokenizer.encode("a😀").unwrap();
        assert_eq!(tokenizer.decode(&ids).unwrap(), "a😀");
    }

    #[test]
    fn test_decode_eot_is_empty() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[("a", 258)])).unwrap();
        assert_eq!(tokenizer.decode(&[0, 258, 0]).unwrap(), "a");
    }

    #[test]
    fn test_decode_unknown_id() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[("a", 258)])).unwrap();
        assert!(matches!(
            tokenizer.decode(&[999]),
            Err(LegatoError::UnknownId { id: 999 })
        ));
    }

    #[test]
    fn test_decode_invalid_fallback() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[("a", 258)])).unwrap();
        // 継続バイトが欠けている。
        assert!(matches!(
            tokenizer.decode(&[0xF0 + 1]),
            Err(LegatoError::InvalidFallbackSequence { .. })
        ));
        // 継続バイトの代わりに語彙IDが現れる。
        assert!(matches!(
            tokenizer.decode(&[0xF0 + 1, 258, 258, 258]),
            Err(LegatoError::InvalidFallbackSequence { .. })
        ));
    }

    #[test]
    fn test_roundtrip_vocabulary_only() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[
            ("吾輩", 300),
            ("は", 301),
            ("猫", 302),
            ("である", 303),
            ("。", 304),
        ]))
        .unwrap();
        let text = "吾輩は猫である。";
        assert_eq!(
            tokenizer.decode(&tokenizer.encode(text).unwrap()).unwrap(),
            text
        );
    }

    #[test]
    fn test_roundtrip_with_fallback() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[("猫", 302)])).unwrap();
        // 語彙にない文字はすべてフォールバック経由で往復する。
        let text = "吾輩は猫である。😀 mixed ASCII 2024";
        assert_eq!(
            tokenizer.decode(&tokenizer.encode(text).unwrap()).unwrap(),
            text
        );
    }

    #[test]
    fn test_blob_roundtrip() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[
            ("吾輩", 300),
            ("は", 301),
            ("猫", 302),
            ("である", 303),
        ]))
        .unwrap();
        let mut bytes = vec![];
        tokenizer.write(&mut bytes).unwrap();

        let restored = Tokenizer::read(bytes.as_slice()).unwrap();
        let text = "吾輩は猫である。";
        assert_eq!(
            restored.encode(text).unwrap(),
            tokenizer.encode(text).unwrap()
        );
        assert_eq!(
            restored.decode(&restored.encode(text).unwrap()).unwrap(),
            text
        );
    }

    #[test]
    fn test_blob_read_rejects_corruption() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[("a", 258)])).unwrap();
        let mut bytes = vec![];
        tokenizer.write(&mut bytes).unwrap();
        bytes[0] = b'X';
        assert!(Tokenizer::read(bytes.as_slice()).is_err());
    }

    #[test]
    fn test_encode_empty() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[("a", 258)])).unwrap();
        assert!(tokenizer.encode("").unwrap().is_empty());
    }

    #[test]
    fn test_encode_invalid_utf8() {
        let tokenizer = Tokenizer::from_vocab(vocab(&[("a", 258)])).unwrap();
        assert!(matches!(
            tokenizer.encode_bytes(&[b'a', 0xFF]),
            Err(LegatoError::InvalidUtf8 { offset: 1 })
        ));
    }
}
