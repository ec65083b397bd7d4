//! Huffman coding over the characters of a document.
//!
//! Codes are emitted as strings of `'0'`/`'1'` together with the character → code
//! table needed to reverse them. Equal frequencies are resolved by creation order:
//! leaves are queued in order of first appearance and each merged node gets the next
//! sequence number, so the same input always yields the same table.

use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

pub type CodeTable = BTreeMap<char, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encoded {
    pub bits: String,
    pub table: CodeTable,
}

impl Encoded {
    pub fn encoded_bits(&self) -> usize {
        self.bits.len()
    }
}

#[derive(Debug)]
enum Node {
    Leaf(char),
    Internal(Box<Node>, Box<Node>),
}

struct Queued {
    freq: usize,
    seq: usize,
    node: Node,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        (self.freq, self.seq) == (other.freq, other.seq)
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        (other.freq, other.seq).cmp(&(self.freq, self.seq))
    }
}

fn frequencies(text: &str) -> Vec<(char, usize)> {
    let mut slots: HashMap<char, usize> = HashMap::new();
    let mut counts: Vec<(char, usize)> = Vec::new();
    for c in text.chars() {
        let slot = *slots.entry(c).or_insert_with(|| {
            counts.push((c, 0));
            counts.len() - 1
        });
        counts[slot].1 += 1;
    }
    counts
}

fn build_tree(text: &str) -> Option<Node> {
    let mut heap: BinaryHeap<Queued> = frequencies(text)
        .into_iter()
        .enumerate()
        .map(|(seq, (c, freq))| Queued { freq, seq, node: Node::Leaf(c) })
        .collect();
    let mut seq = heap.len();
    while heap.len() > 1 {
        let (Some(left), Some(right)) = (heap.pop(), heap.pop()) else { break };
        heap.push(Queued {
            freq: left.freq + right.freq,
            seq,
            node: Node::Internal(Box::new(left.node), Box::new(right.node)),
        });
        seq += 1;
    }
    heap.pop().map(|q| q.node)
}

fn assign_codes(node: &Node, prefix: &mut String, table: &mut CodeTable) {
    match node {
        // a lone leaf at the root still needs one bit
        Node::Leaf(c) if prefix.is_empty() => {
            table.insert(*c, "0".to_string());
        }
        Node::Leaf(c) => {
            table.insert(*c, prefix.clone());
        }
        Node::Internal(left, right) => {
            prefix.push('0');
            assign_codes(left, prefix, table);
            prefix.pop();
            prefix.push('1');
            assign_codes(right, prefix, table);
            prefix.pop();
        }
    }
}

/// Build the prefix-free code table for the characters of `text`.
pub fn code_table(text: &str) -> CodeTable {
    let mut table = CodeTable::new();
    if let Some(root) = build_tree(text) {
        assign_codes(&root, &mut String::new(), &mut table);
    }
    table
}

pub fn encode(text: &str) -> Encoded {
    let table = code_table(text);
    let mut bits = String::new();
    for c in text.chars() {
        if let Some(code) = table.get(&c) {
            bits.push_str(code);
        }
    }
    Encoded { bits, table }
}

#[derive(Default)]
struct TrieNode {
    children: [Option<usize>; 2],
    symbol: Option<char>,
}

/// Decoding trie rebuilt from a code table.
struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    fn from_table(table: &CodeTable) -> Result<Self> {
        let mut trie = Trie { nodes: vec![TrieNode::default()] };
        for (&symbol, code) in table {
            if code.is_empty() {
                return Err(AnalyticsError::InvalidCodeTable(format!("empty code for {symbol:?}")));
            }
            let mut cursor = 0;
            for b in code.bytes() {
                if trie.nodes[cursor].symbol.is_some() {
                    return Err(AnalyticsError::InvalidCodeTable(format!("code for {symbol:?} extends another code")));
                }
                let branch = bit_index(b)
                    .ok_or_else(|| AnalyticsError::InvalidCodeTable(format!("code for {symbol:?} is not binary")))?;
                let existing = trie.nodes[cursor].children[branch];
                cursor = match existing {
                    Some(next) => next,
                    None => {
                        trie.nodes.push(TrieNode::default());
                        let next = trie.nodes.len() - 1;
                        trie.nodes[cursor].children[branch] = Some(next);
                        next
                    }
                };
            }
            let end = &mut trie.nodes[cursor];
            if end.symbol.is_some() || end.children.iter().any(Option::is_some) {
                return Err(AnalyticsError::InvalidCodeTable(format!("code for {symbol:?} is a prefix of another code")));
            }
            end.symbol = Some(symbol);
        }
        Ok(trie)
    }
}

fn bit_index(b: u8) -> Option<usize> {
    match b {
        b'0' => Some(0),
        b'1' => Some(1),
        _ => None,
    }
}

/// Walk `bits` through the codes of `table`, failing on any bit path that does not
/// end exactly on a character.
pub fn decode(bits: &str, table: &CodeTable) -> Result<String> {
    let trie = Trie::from_table(table)?;
    let mut out = String::new();
    let mut cursor = 0;
    for (position, b) in bits.bytes().enumerate() {
        let branch = bit_index(b).ok_or(AnalyticsError::CorruptEncoding { position, reason: "not a bit" })?;
        cursor = trie.nodes[cursor].children[branch]
            .ok_or(AnalyticsError::CorruptEncoding { position, reason: "no code follows this path" })?;
        if let Some(symbol) = trie.nodes[cursor].symbol {
            out.push(symbol);
            cursor = 0;
        }
    }
    if cursor != 0 {
        return Err(AnalyticsError::CorruptEncoding { position: bits.len(), reason: "truncated code" });
    }
    Ok(out)
}
