//! 配列ベースのトライ木
//!
//! このモジュールは、バイト列またはコードポイント列をキーとする
//! コンパクトなトライ木を提供します。ノードはポインタ木ではなく
//! アリーナ（`Vec`）に格納され、子の集合はノードごとに
//! 葉・単一トークン・小規模ソート配列・ハッシュマップの4種類の
//! 表現から選択されます。走査はカーソル値（ノードインデックス）を
//! 持ち回るだけで、後方ポインタはありません。

pub mod hashmap;

use core::fmt::Debug;
use core::hash::Hash;
use std::io::{Read, Write};

use crate::errors::{LegatoError, Result};
use crate::idmap::MAX_ID;
use crate::trie::hashmap::{read_u32, TokenHashMap};

/// トライのキーを構成する1トークン
///
/// UTF-8バイト（`u8`）またはUnicodeコードポイント（`u32`）を想定しています。
pub trait Token: Copy + Eq + Ord + Hash + Debug {
    /// シリアライズ時・ハッシュ時のバイト幅
    const WIDTH: u8;

    /// トークンをu32値へ変換します
    fn to_u32(self) -> u32;

    /// u32値からトークンを復元します
    ///
    /// 値がトークンの範囲外の場合は`None`を返します。
    fn from_u32(raw: u32) -> Option<Self>;
}

impl Token for u8 {
    const WIDTH: u8 = 1;

    #[inline(always)]
    fn to_u32(self) -> u32 {
        u32::from(self)
    }

    #[inline(always)]
    fn from_u32(raw: u32) -> Option<Self> {
        u8::try_from(raw).ok()
    }
}

impl Token for u32 {
    const WIDTH: u8 = 4;

    #[inline(always)]
    fn to_u32(self) -> u32 {
        self
    }

    #[inline(always)]
    fn from_u32(raw: u32) -> Option<Self> {
        Some(raw)
    }
}

/// 小規模ソート配列で保持する兄弟数の上限
const MAX_ARRAY_CHILDREN: usize = 8;

/// 配列内を線形走査で済ませる兄弟数の上限
const LINEAR_SCAN_MAX: usize = 4;

/// ノードインデックスが収まるペイロードビット数
const PAYLOAD_BITS: u32 = 29;
const PAYLOAD_MASK: u32 = (1 << PAYLOAD_BITS) - 1;

/// `inode`ワード上位3ビットのバリアントタグ
const TAG_LEAF: u32 = 0;
const TAG_SINGLE: u32 = 1;
const TAG_ARRAY: u32 = 2;
const TAG_MAP: u32 = 3;

/// 値なしを表すシリアライズ上の番兵
const NO_VALUE: u32 = u32::MAX;

const MAGIC: &[u8; 4] = b"LGTR";
const FORMAT_VERSION: u32 = 1;

/// 子ノード集合の表現
#[derive(Clone, Debug, PartialEq, Eq)]
enum Children<K> {
    /// 子なし
    Leaf,
    /// ちょうど1つの子
    Single { token: K, child: u32 },
    /// トークン昇順の小規模配列（[`MAX_ARRAY_CHILDREN`]以下）
    Array { tokens: Vec<K>, children: Vec<u32> },
    /// ハッシュマップへのインデックス
    Map(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Node<K> {
    value: Option<u32>,
    children: Children<K>,
}

/// 走査の再開位置
///
/// [`Trie::traverse`]が返すカーソルは、同じトライに対する後続の走査で
/// そのまま使えます。トライを作り直すとカーソルは無効になります。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor(u32);

impl Cursor {
    /// ルートノードを指すカーソル
    pub const ROOT: Self = Self(0);
}

/// 走査の結果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Traverse {
    /// 終端に到達し、値を持つノードで停止した
    Value {
        /// 停止位置
        cursor: Cursor,
        /// ノードの値
        value: u32,
    },
    /// 終端に到達したが、ノードは値を持たない（より長い接頭辞が存在しうる）
    Prefix {
        /// 停止位置
        cursor: Cursor,
    },
    /// 経路が途切れた
    Fail {
        /// 途切れるまでに消費したトークン数
        consumed: usize,
    },
}

/// 配列ベースのトライ木
///
/// # 不変条件
///
/// - ノード数・エンティティ数は2^29未満（`inode`ペイロードに収まる）
/// - 配列バリアントの兄弟はトークン昇順
/// - シリアライズとデシリアライズはバイト単位で往復一致する
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trie<K> {
    nodes: Vec<Node<K>>,
    hashmaps: Vec<TokenHashMap<K>>,
}

impl<K> Trie<K>
where
    K: Token,
{
    /// ソート済みのキー列からトライを構築します
    ///
    /// キーは辞書順に並んでいて、重複と空キーを含まないことが前提です。
    /// `keys[i]`には`values[i]`が対応します。
    ///
    /// # エラー
    ///
    /// * [`LegatoError::InvalidArgument`] - 入力が空、または長さが不一致
    /// * [`LegatoError::EmptyKey`] - 長さゼロのキーが含まれる
    /// * [`LegatoError::UnsortedOrDuplicate`] - ソート順・一意性違反
    pub fn build<S>(keys: &[S], values: &[u32]) -> Result<Self>
    where
        S: AsRef<[K]>,
    {
        if keys.is_empty() {
            return Err(LegatoError::invalid_argument("keys", "must not be empty"));
        }
        if keys.len() != values.len() {
            return Err(LegatoError::invalid_argument(
                "values",
                format!("got {} values for {} keys", values.len(), keys.len()),
            ));
        }
        for (i, key) in keys.iter().enumerate() {
            if key.as_ref().is_empty() {
                return Err(LegatoError::EmptyKey { index: i });
            }
        }
        if let Some(i) = values.iter().position(|&v| v > MAX_ID) {
            return Err(LegatoError::invalid_argument(
                "values",
                format!("value {} at index {i} does not fit in a non-negative 32-bit integer", values[i]),
            ));
        }
        for i in 1..keys.len() {
            if keys[i - 1].as_ref() >= keys[i].as_ref() {
                return Err(LegatoError::UnsortedOrDuplicate { index: i });
            }
        }

        let mut trie = Self {
            nodes: Vec::new(),
            hashmaps: Vec::new(),
        };
        trie.build_range(keys, values, 0, 0, keys.len())?;
        Ok(trie)
    }

    /// `[lo, hi)`のキー群（深さ`depth`までの接頭辞を共有）に対する
    /// ノードを構築し、そのインデックスを返します
    fn build_range<S>(
        &mut self,
        keys: &[S],
        values: &[u32],
        depth: usize,
        lo: usize,
        hi: usize,
    ) -> Result<u32>
    where
        S: AsRef<[K]>,
    {
        if self.nodes.len() >= PAYLOAD_MASK as usize {
            return Err(LegatoError::TooMany { what: "Trie" });
        }
        let node_idx = self.nodes.len() as u32;
        self.nodes.push(Node {
            value: None,
            children: Children::Leaf,
        });

        // ソート済みなので、この接頭辞そのものと一致するキーは先頭にしか来ない。
        let mut start = lo;
        if keys[lo].as_ref().len() == depth {
            self.nodes[node_idx as usize].value = Some(values[lo]);
            start = lo + 1;
        }

        // 次トークンごとの兄弟グループ境界を走査する。
        let mut groups: Vec<(K, usize, usize)> = Vec::new();
        let mut i = start;
        while i < hi {
            let token = keys[i].as_ref()[depth];
            let mut j = i + 1;
            while j < hi && keys[j].as_ref()[depth] == token {
                j += 1;
            }
            groups.push((token, i, j));
            i = j;
        }

        let children = match groups.len() {
            0 => Children::Leaf,
            1 => {
                let (token, g_lo, g_hi) = groups[0];
                let child = self.build_range(keys, values, depth + 1, g_lo, g_hi)?;
                Children::Single { token, child }
            }
            n if n <= MAX_ARRAY_CHILDREN => {
                let mut tokens = Vec::with_capacity(n);
                let mut children = Vec::with_capacity(n);
                for (token, g_lo, g_hi) in groups {
                    tokens.push(token);
                    children.push(self.build_range(keys, values, depth + 1, g_lo, g_hi)?);
                }
                Children::Array { tokens, children }
            }
            _ => {
                let map_idx = self.hashmaps.len() as u32;
                self.hashmaps.push(TokenHashMap::new());
                for (token, g_lo, g_hi) in groups {
                    let child = self.build_range(keys, values, depth + 1, g_lo, g_hi)?;
                    self.hashmaps[map_idx as usize].update(token, child)?;
                }
                Children::Map(map_idx)
            }
        };
        self.nodes[node_idx as usize].children = children;
        Ok(node_idx)
    }

    /// トークンに対応する子ノードを返します
    #[inline]
    fn child(&self, node_idx: u32, token: K) -> Option<u32> {
        match &self.nodes[node_idx as usize].children {
            Children::Leaf => None,
            Children::Single { token: t, child } => (*t == token).then_some(*child),
            Children::Array { tokens, children } => {
                if tokens.len() <= LINEAR_SCAN_MAX {
                    tokens
                        .iter()
                        .position(|t| *t == token)
                        .map(|i| children[i])
                } else {
                    tokens
                        .binary_search(&token)
                        .ok()
                        .map(|i| children[i])
                }
            }
            Children::Map(map_idx) => self.hashmaps[*map_idx as usize].find(token),
        }
    }

    /// 完全一致検索
    ///
    /// キー全体に一致する経路が存在し、終端ノードが値を持つ場合のみ
    /// その値を返します。
    pub fn exact_match(&self, key: &[K]) -> Option<u32> {
        let mut node_idx = 0;
        for &token in key {
            node_idx = self.child(node_idx, token)?;
        }
        self.nodes[node_idx as usize].value
    }

    /// 最長接頭辞検索
    ///
    /// キーの接頭辞のうち、値を持つ最長のものを
    /// `(接頭辞のトークン数, 値)` で返します。
    pub fn longest_prefix(&self, key: &[K]) -> Option<(usize, u32)> {
        let mut node_idx = 0;
        let mut best = None;
        for (i, &token) in key.iter().enumerate() {
            match self.child(node_idx, token) {
                Some(child) => {
                    node_idx = child;
                    if let Some(value) = self.nodes[node_idx as usize].value {
                        best = Some((i + 1, value));
                    }
                }
                None => break,
            }
        }
        best
    }

    /// 再開可能な走査
    ///
    /// `from`で示されるノードから`tokens`を順に消費して降下します。
    /// 戻り値のカーソルを次の呼び出しの`from`に渡すことで、
    /// 一致済みの位置から再歩行なしで走査を続けられます。
    pub fn traverse(&self, from: Cursor, tokens: &[K]) -> Traverse {
        let mut node_idx = from.0;
        for (i, &token) in tokens.iter().enumerate() {
            match self.child(node_idx, token) {
                Some(child) => node_idx = child,
                None => return Traverse::Fail { consumed: i },
            }
        }
        match self.nodes[node_idx as usize].value {
            Some(value) => Traverse::Value {
                cursor: Cursor(node_idx),
                value,
            },
            None => Traverse::Prefix {
                cursor: Cursor(node_idx),
            },
        }
    }

    /// ノード数を返します
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// トライをシリアライズします
    ///
    /// 固定ヘッダ（マジック、バージョン、キー幅、ノード数、マップ数）、
    /// パックされた`inode`列、初出順のハッシュマップ本体の順で、
    /// すべてリトルエンディアンで書き出します。
    pub fn serialize<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MAGIC)?;
        wtr.write_all(&FORMAT_VERSION.to_le_bytes())?;
        wtr.write_all(&u32::from(K::WIDTH).to_le_bytes())?;
        wtr.write_all(&(self.nodes.len() as u32).to_le_bytes())?;
        wtr.write_all(&(self.hashmaps.len() as u32).to_le_bytes())?;

        for node in &self.nodes {
            wtr.write_all(&node.value.unwrap_or(NO_VALUE).to_le_bytes())?;
            match &node.children {
                Children::Leaf => {
                    wtr.write_all(&pack_inode(TAG_LEAF, 0).to_le_bytes())?;
                }
                Children::Single { token, child } => {
                    wtr.write_all(&pack_inode(TAG_SINGLE, *child).to_le_bytes())?;
                    wtr.write_all(&token.to_u32().to_le_bytes())?;
                }
                Children::Array { tokens, children } => {
                    wtr.write_all(&pack_inode(TAG_ARRAY, tokens.len() as u32).to_le_bytes())?;
                    for t in tokens {
                        wtr.write_all(&t.to_u32().to_le_bytes())?;
                    }
                    for c in children {
                        wtr.write_all(&c.to_le_bytes())?;
                    }
                }
                Children::Map(map_idx) => {
                    wtr.write_all(&pack_inode(TAG_MAP, *map_idx).to_le_bytes())?;
                }
            }
        }
        for map in &self.hashmaps {
            map.serialize(&mut wtr)?;
        }
        Ok(())
    }

    /// バイト列からトライを復元します
    ///
    /// ヘッダとすべての相互参照（子インデックス、マップインデックス、
    /// 配列のソート順）を検証します。
    ///
    /// # エラー
    ///
    /// 不変条件違反を検出した場合、[`LegatoError::CorruptBlob`] が
    /// 返されます。
    pub fn deserialize<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0u8; 4];
        rdr.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(LegatoError::corrupt_blob("bad trie magic"));
        }
        let version = read_u32(&mut rdr)?;
        if version != FORMAT_VERSION {
            return Err(LegatoError::corrupt_blob(format!(
                "unsupported trie format version {version}"
            )));
        }
        let width = read_u32(&mut rdr)?;
        if width != u32::from(K::WIDTH) {
            return Err(LegatoError::corrupt_blob(format!(
                "trie key width {} does not match expected {}",
                width,
                K::WIDTH
            )));
        }
        let num_nodes = read_u32(&mut rdr)? as usize;
        let num_hashmaps = read_u32(&mut rdr)? as usize;
        if num_nodes == 0 || num_nodes > PAYLOAD_MASK as usize {
            return Err(LegatoError::corrupt_blob("trie node count out of range"));
        }

        let read_token = |rdr: &mut R| -> Result<K> {
            let raw = read_u32(rdr)?;
            K::from_u32(raw).ok_or_else(|| {
                LegatoError::corrupt_blob(format!("token {raw} out of range for key width"))
            })
        };
        let check_child = |child: u32| -> Result<u32> {
            if (child as usize) < num_nodes {
                Ok(child)
            } else {
                Err(LegatoError::corrupt_blob(format!(
                    "child index {child} out of range"
                )))
            }
        };

        // ノード数は未検証の入力なので、領域は読み進めながら確保する。
        let mut nodes = Vec::new();
        for _ in 0..num_nodes {
            let raw_value = read_u32(&mut rdr)?;
            let value = if raw_value == NO_VALUE {
                None
            } else if raw_value <= MAX_ID {
                Some(raw_value)
            } else {
                return Err(LegatoError::corrupt_blob(format!(
                    "node value {raw_value} out of range"
                )));
            };
            let inode = read_u32(&mut rdr)?;
            let (tag, payload) = unpack_inode(inode);
            let children = match tag {
                TAG_LEAF => Children::Leaf,
                TAG_SINGLE => {
                    let child = check_child(payload)?;
                    let token = read_token(&mut rdr)?;
                    Children::Single { token, child }
                }
                TAG_ARRAY => {
                    let n = payload as usize;
                    if n == 0 || n > MAX_ARRAY_CHILDREN {
                        return Err(LegatoError::corrupt_blob(format!(
                            "array sibling count {n} out of range"
                        )));
                    }
                    let mut tokens = Vec::with_capacity(n);
                    for _ in 0..n {
                        tokens.push(read_token(&mut rdr)?);
                    }
                    if tokens.windows(2).any(|w| w[0] >= w[1]) {
                        return Err(LegatoError::corrupt_blob("array siblings are not sorted"));
                    }
                    let mut children = Vec::with_capacity(n);
                    for _ in 0..n {
                        children.push(check_child(read_u32(&mut rdr)?)?);
                    }
                    Children::Array { tokens, children }
                }
                TAG_MAP => {
                    if payload as usize >= num_hashmaps {
                        return Err(LegatoError::corrupt_blob(format!(
                            "hashmap index {payload} out of range"
                        )));
                    }
                    Children::Map(payload)
                }
                _ => {
                    return Err(LegatoError::corrupt_blob(format!(
                        "unknown inode tag {tag}"
                    )));
                }
            };
            nodes.push(Node { value, children });
        }

        let mut hashmaps = Vec::new();
        for _ in 0..num_hashmaps {
            let map = TokenHashMap::deserialize(&mut rdr)?;
            for (_, child) in map.iter() {
                check_child(child)?;
            }
            hashmaps.push(map);
        }

        Ok(Self { nodes, hashmaps })
    }
}

#[inline(always)]
const fn pack_inode(tag: u32, payload: u32) -> u32 {
    (tag << PAYLOAD_BITS) | (payload & PAYLOAD_MASK)
}

#[inline(always)]
const fn unpack_inode(word: u32) -> (u32, u32) {
    (word >> PAYLOAD_BITS, word & PAYLOAD_MASK)
}

/// `inode`ワードの人間可読表現を返します
///
/// デバッグビルドおよびテスト専用です。
#[cfg(any(test, debug_assertions))]
#[allow(dead_code)]
pub(crate) fn describe_inode(word: u32) -> String {
    let (tag, payload) = unpack_inode(word);
    match tag {
        TAG_LEAF => "leaf".to_string(),
        TAG_SINGLE => format!("single(child={payload})"),
        TAG_ARRAY => format!("array(len={payload})"),
        _ => format!("map(index={payload})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_ascii() -> Trie<u8> {
        // キーは辞書順に並べておく。
        let mut kvs: Vec<(&[u8], u32)> = vec![
            (b"he", 0),
            (b"hello", 1),
            (b"word", 4),
            (b"world", 5),
            (b"you", 2),
            (b"your", 3),
        ];
        kvs.sort_by(|a, b| a.0.cmp(b.0));
        let keys: Vec<&[u8]> = kvs.iter().map(|(k, _)| *k).collect();
        let values: Vec<u32> = kvs.iter().map(|(_, v)| *v).collect();
        Trie::build(&keys, &values).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let trie = build_ascii();
        assert_eq!(trie.exact_match(b"he"), Some(0));
        assert_eq!(trie.exact_match(b"hello"), Some(1));
        assert_eq!(trie.exact_match(b"world"), Some(5));
        assert_eq!(trie.exact_match(b"hell"), None);
        assert_eq!(trie.exact_match(b"worlds"), None);
    }

    #[test]
    fn test_longest_prefix() {
        let trie = build_ascii();
        assert_eq!(trie.longest_prefix(b"hellos"), Some((5, 1)));
        assert_eq!(trie.longest_prefix(b"word"), Some((4, 4)));
        assert_eq!(trie.longest_prefix(b"hel"), Some((2, 0)));
        assert_eq!(trie.longest_prefix(b"abc"), None);
    }

    #[test]
    fn test_traverse_resume() {
        let trie = build_ascii();
        let cursor = match trie.traverse(Cursor::ROOT, b"he") {
            Traverse::Value { cursor, value } => {
                assert_eq!(value, 0);
                cursor
            }
            other => panic!("unexpected result: {other:?}"),
        };
        // 一致済み位置から続きのトークンだけ渡す。
        match trie.traverse(cursor, b"llo") {
            Traverse::Value { value, .. } => assert_eq!(value, 1),
            other => panic!("unexpected result: {other:?}"),
        }
        match trie.traverse(cursor, b"ll") {
            Traverse::Prefix { .. } => {}
            other => panic!("unexpected result: {other:?}"),
        }
        match trie.traverse(cursor, b"x") {
            Traverse::Fail { consumed } => assert_eq!(consumed, 0),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_codepoint_keys() {
        use crate::utf8::codepoints;

        let words = ["である", "は", "猫", "吾輩"];
        let mut keys: Vec<Vec<u32>> = words.iter().map(|w| codepoints(w)).collect();
        keys.sort();
        let values: Vec<u32> = (0..keys.len() as u32).collect();
        let trie = Trie::build(&keys, &values).unwrap();

        assert!(trie.exact_match(&codepoints("吾輩")).is_some());
        assert_eq!(trie.exact_match(&codepoints("吾")), None);
    }

    #[test]
    fn test_build_empty_input() {
        let keys: Vec<&[u8]> = vec![];
        assert!(Trie::<u8>::build(&keys, &[]).is_err());
    }

    #[test]
    fn test_build_empty_key() {
        let keys: Vec<&[u8]> = vec![b"", b"a"];
        let result = Trie::<u8>::build(&keys, &[0, 1]);
        assert!(matches!(result, Err(LegatoError::EmptyKey { index: 0 })));
    }

    #[test]
    fn test_build_unsorted() {
        let keys: Vec<&[u8]> = vec![b"b", b"a"];
        let result = Trie::<u8>::build(&keys, &[0, 1]);
        assert!(matches!(
            result,
            Err(LegatoError::UnsortedOrDuplicate { index: 1 })
        ));
    }

    #[test]
    fn test_build_duplicate() {
        let keys: Vec<&[u8]> = vec![b"a", b"a"];
        let result = Trie::<u8>::build(&keys, &[0, 1]);
        assert!(matches!(
            result,
            Err(LegatoError::UnsortedOrDuplicate { index: 1 })
        ));
    }

    #[test]
    fn test_hashmap_variant() {
        // ルート直下に9個以上の兄弟を作り、ハッシュマップ表現を通す。
        let keys: Vec<Vec<u8>> = (b'a'..=b'p').map(|c| vec![c, b'x']).collect();
        let values: Vec<u32> = (0..keys.len() as u32).collect();
        let trie = Trie::build(&keys, &values).unwrap();
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(trie.exact_match(key), Some(i as u32));
        }
        assert_eq!(trie.exact_match(b"qx"), None);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let trie = build_ascii();
        let mut bytes = vec![];
        trie.serialize(&mut bytes).unwrap();
        let restored = Trie::<u8>::deserialize(bytes.as_slice()).unwrap();
        assert_eq!(trie, restored);
        assert_eq!(trie.num_nodes(), restored.num_nodes());

        let mut bytes2 = vec![];
        restored.serialize(&mut bytes2).unwrap();
        assert_eq!(bytes, bytes2);
    }

    #[test]
    fn test_serialize_roundtrip_hashmap_variant() {
        let keys: Vec<Vec<u8>> = (0u8..64).map(|c| vec![c + 1, c + 2]).collect();
        let values: Vec<u32> = (0..keys.len() as u32).collect();
        let trie = Trie::build(&keys, &values).unwrap();

        let mut bytes = vec![];
        trie.serialize(&mut bytes).unwrap();
        let restored = Trie::<u8>::deserialize(bytes.as_slice()).unwrap();
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(restored.exact_match(key), Some(i as u32));
        }
    }

    #[test]
    fn test_deserialize_rejects_wrong_width() {
        let trie = build_ascii();
        let mut bytes = vec![];
        trie.serialize(&mut bytes).unwrap();
        assert!(Trie::<u32>::deserialize(bytes.as_slice()).is_err());
    }

    #[test]
    fn test_deserialize_rejects_bad_magic() {
        let trie = build_ascii();
        let mut bytes = vec![];
        trie.serialize(&mut bytes).unwrap();
        bytes[0] = b'X';
        assert!(Trie::<u8>::deserialize(bytes.as_slice()).is_err());
    }

    #[test]
    fn test_describe_inode() {
        assert_eq!(describe_inode(pack_inode(TAG_LEAF, 0)), "leaf");
        assert_eq!(describe_inode(pack_inode(TAG_SINGLE, 7)), "single(child=7)");
        assert_eq!(describe_inode(pack_inode(TAG_ARRAY, 3)), "array(len=3)");
        assert_eq!(describe_inode(pack_inode(TAG_MAP, 1)), "map(index=1)");
    }
}
