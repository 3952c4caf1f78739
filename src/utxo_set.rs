//! UTXOSet: a keyed collection of UTXOs with set-combination rules
//!
//! UTXOs are keyed by their UTXOID and enumerated in insertion order. Two
//! indexes (address → UTXOIDs, assetID → UTXOIDs) are kept
//! in step with the map on every insert, replace and remove.
//!
//! Merge rules operate on the id spaces of two sets, Self (S) and New (N):
//!
//! | rule             | ids            |
//! |------------------|----------------|
//! | `intersection`   | S ∩ N          |
//! | `differenceSelf` | S − N          |
//! | `differenceNew`  | N − S          |
//! | `symDifference`  | (S − N) ∪ (N − S) |
//! | `union`          | S ∪ N          |
//! | `unionMinusNew`  | (S ∪ N) − N    |
//! | `unionMinusSelf` | (S ∪ N) − S    |
//!
//! When both sets hold an id, the UTXO from New is the one kept. Inputs are
//! never mutated; every rule yields a fresh set.

use crate::bintools::{decode_checked, unix_now, Encoding};
use crate::config::CodecConfig;
use crate::constants::ASSET_ID_LENGTH;
use crate::error::{Result, UtxoError};
use crate::types::*;
use crate::utxo::{Utxo, UtxoFields};
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Type tag written into serialized set documents
pub const UTXO_SET_TYPE_NAME: &str = "UTXOSet";

/// Anything that normalizes to a [`Utxo`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtxoLike {
    Decoded(Utxo),
    /// cb58 string of the full UTXO bytes
    Encoded(String),
    Raw(ByteString),
}

impl From<Utxo> for UtxoLike {
    fn from(utxo: Utxo) -> Self {
        UtxoLike::Decoded(utxo)
    }
}

impl From<&Utxo> for UtxoLike {
    fn from(utxo: &Utxo) -> Self {
        UtxoLike::Decoded(utxo.clone())
    }
}

impl From<String> for UtxoLike {
    fn from(encoded: String) -> Self {
        UtxoLike::Encoded(encoded)
    }
}

impl From<&str> for UtxoLike {
    fn from(encoded: &str) -> Self {
        UtxoLike::Encoded(encoded.to_string())
    }
}

impl From<ByteString> for UtxoLike {
    fn from(bytes: ByteString) -> Self {
        UtxoLike::Raw(bytes)
    }
}

/// Lookup key for removal and membership: a UTXOID or a UTXO in any form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtxoRef {
    Id(String),
    Item(UtxoLike),
}

impl UtxoRef {
    pub fn id(utxo_id: impl Into<String>) -> Self {
        UtxoRef::Id(utxo_id.into())
    }
}

impl From<UtxoLike> for UtxoRef {
    fn from(like: UtxoLike) -> Self {
        UtxoRef::Item(like)
    }
}

impl From<Utxo> for UtxoRef {
    fn from(utxo: Utxo) -> Self {
        UtxoRef::Item(UtxoLike::Decoded(utxo))
    }
}

impl From<&Utxo> for UtxoRef {
    fn from(utxo: &Utxo) -> Self {
        UtxoRef::Item(UtxoLike::Decoded(utxo.clone()))
    }
}

/// An asset identifier as raw bytes or its cb58 form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    Raw(AssetId),
    Encoded(String),
}

impl AssetRef {
    pub fn resolve(&self) -> Result<AssetId> {
        match self {
            AssetRef::Raw(id) => Ok(*id),
            AssetRef::Encoded(encoded) => {
                let bytes = decode_checked(encoded)?;
                <[u8; ASSET_ID_LENGTH]>::try_from(bytes.as_slice()).map_err(|_| {
                    UtxoError::Decoding(format!("assetID must be 32 bytes, got {}", bytes.len()))
                })
            }
        }
    }
}

impl From<AssetId> for AssetRef {
    fn from(id: AssetId) -> Self {
        AssetRef::Raw(id)
    }
}

impl From<&AssetId> for AssetRef {
    fn from(id: &AssetId) -> Self {
        AssetRef::Raw(*id)
    }
}

impl From<&str> for AssetRef {
    fn from(encoded: &str) -> Self {
        AssetRef::Encoded(encoded.to_string())
    }
}

impl From<String> for AssetRef {
    fn from(encoded: String) -> Self {
        AssetRef::Encoded(encoded)
    }
}

/// Result of [`UtxoSet::add`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted(Utxo),
    Replaced { previous: Utxo, current: Utxo },
    /// The id was present and overwrite was off; the set is unchanged
    Skipped,
}

impl AddOutcome {
    /// The UTXO now stored, unless the add was skipped
    pub fn added(&self) -> Option<&Utxo> {
        match self {
            AddOutcome::Inserted(utxo) => Some(utxo),
            AddOutcome::Replaced { current, .. } => Some(current),
            AddOutcome::Skipped => None,
        }
    }

    pub fn into_added(self) -> Option<Utxo> {
        match self {
            AddOutcome::Inserted(utxo) => Some(utxo),
            AddOutcome::Replaced { current, .. } => Some(current),
            AddOutcome::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, AddOutcome::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeRule {
    Intersection,
    DifferenceSelf,
    DifferenceNew,
    SymDifference,
    Union,
    UnionMinusNew,
    UnionMinusSelf,
}

impl MergeRule {
    pub const ALL: [MergeRule; 7] = [
        MergeRule::Intersection,
        MergeRule::DifferenceSelf,
        MergeRule::DifferenceNew,
        MergeRule::SymDifference,
        MergeRule::Union,
        MergeRule::UnionMinusNew,
        MergeRule::UnionMinusSelf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeRule::Intersection => "intersection",
            MergeRule::DifferenceSelf => "differenceSelf",
            MergeRule::DifferenceNew => "differenceNew",
            MergeRule::SymDifference => "symDifference",
            MergeRule::Union => "union",
            MergeRule::UnionMinusNew => "unionMinusNew",
            MergeRule::UnionMinusSelf => "unionMinusSelf",
        }
    }
}

impl FromStr for MergeRule {
    type Err = UtxoError;

    fn from_str(s: &str) -> Result<Self> {
        MergeRule::ALL
            .iter()
            .copied()
            .find(|rule| rule.as_str() == s)
            .ok_or_else(|| UtxoError::InvalidRule(s.to_string()))
    }
}

impl fmt::Display for MergeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized form of a [`UtxoSet`]. Indexes are not stored; they are
/// rebuilt when the document is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoSetDocument {
    pub type_name: String,
    pub encoding: Encoding,
    pub utxos: Vec<UtxoFields>,
}

#[derive(Debug, Clone, Default)]
pub struct UtxoSet {
    config: CodecConfig,
    utxos: IndexMap<String, Utxo>,
    address_utxos: HashMap<Address, IndexSet<String>>,
    asset_utxos: HashMap<AssetId, IndexSet<String>>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set that decodes incoming UTXOs with `config`
    pub fn with_config(config: CodecConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    /// (UTXOID, UTXO) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Utxo)> {
        self.utxos.iter()
    }

    fn normalize(&self, like: UtxoLike) -> Result<(String, Utxo)> {
        let utxo = match like {
            UtxoLike::Decoded(utxo) => {
                // Only encodable UTXOs may enter the set
                utxo.to_bytes()?;
                utxo
            }
            UtxoLike::Encoded(encoded) => Utxo::from_cb58_with(&encoded, &self.config)?,
            UtxoLike::Raw(bytes) => Utxo::from_bytes_with(&bytes, &self.config)?,
        };
        let id = utxo.utxo_id()?;
        Ok((id, utxo))
    }

    fn resolve_id(&self, key: UtxoRef) -> Result<String> {
        match key {
            UtxoRef::Id(id) => Ok(id),
            UtxoRef::Item(UtxoLike::Decoded(utxo)) => utxo.utxo_id(),
            UtxoRef::Item(like) => Ok(self.normalize(like)?.0),
        }
    }

    fn index(&mut self, id: &str, utxo: &Utxo) {
        if let Some(output) = utxo.output() {
            for address in output.addresses() {
                self.address_utxos.entry(*address).or_default().insert(id.to_string());
            }
        }
        if let Some(asset_id) = utxo.asset_id() {
            self.asset_utxos.entry(*asset_id).or_default().insert(id.to_string());
        }
    }

    fn unindex(&mut self, id: &str, utxo: &Utxo) {
        if let Some(output) = utxo.output() {
            for address in output.addresses() {
                if let Some(ids) = self.address_utxos.get_mut(address) {
                    ids.shift_remove(id);
                    if ids.is_empty() {
                        self.address_utxos.remove(address);
                    }
                }
            }
        }
        if let Some(asset_id) = utxo.asset_id() {
            if let Some(ids) = self.asset_utxos.get_mut(asset_id) {
                ids.shift_remove(id);
                if ids.is_empty() {
                    self.asset_utxos.remove(asset_id);
                }
            }
        }
    }

    /// Add a UTXO. An id already present is left alone unless `overwrite`
    /// is set, in which case the stored UTXO is replaced in place.
    pub fn add(&mut self, item: impl Into<UtxoLike>, overwrite: bool) -> Result<AddOutcome> {
        let (id, utxo) = self.normalize(item.into())?;

        if self.utxos.contains_key(&id) && !overwrite {
            log::debug!("skipping existing utxo {}", id);
            return Ok(AddOutcome::Skipped);
        }

        let previous = self.utxos.insert(id.clone(), utxo.clone());
        if let Some(previous) = &previous {
            self.unindex(&id, previous);
        }
        self.index(&id, &utxo);

        Ok(match previous {
            Some(previous) => {
                log::debug!("replaced utxo {}", id);
                AddOutcome::Replaced { previous, current: utxo }
            }
            None => {
                log::debug!("inserted utxo {}", id);
                AddOutcome::Inserted(utxo)
            }
        })
    }

    /// Add each item in order; returns only the UTXOs actually stored.
    /// On error, items before the failing one stay added.
    pub fn add_array<I, T>(&mut self, items: I, overwrite: bool) -> Result<Vec<Utxo>>
    where
        I: IntoIterator<Item = T>,
        T: Into<UtxoLike>,
    {
        let mut added = Vec::new();
        for item in items {
            if let Some(utxo) = self.add(item, overwrite)?.into_added() {
                added.push(utxo);
            }
        }
        Ok(added)
    }

    /// Remove by UTXOID; `Ok(None)` when the id is not in the set
    pub fn remove(&mut self, key: impl Into<UtxoRef>) -> Result<Option<Utxo>> {
        let id = self.resolve_id(key.into())?;
        match self.utxos.shift_remove(&id) {
            Some(utxo) => {
                self.unindex(&id, &utxo);
                log::debug!("removed utxo {}", id);
                Ok(Some(utxo))
            }
            None => Ok(None),
        }
    }

    pub fn remove_array<I, T>(&mut self, keys: I) -> Result<Vec<Utxo>>
    where
        I: IntoIterator<Item = T>,
        T: Into<UtxoRef>,
    {
        let mut removed = Vec::new();
        for key in keys {
            if let Some(utxo) = self.remove(key)? {
                removed.push(utxo);
            }
        }
        Ok(removed)
    }

    pub fn includes(&self, key: impl Into<UtxoRef>) -> Result<bool> {
        let id = self.resolve_id(key.into())?;
        Ok(self.utxos.contains_key(&id))
    }

    pub fn get_utxo(&self, utxo_id: &str) -> Option<&Utxo> {
        self.utxos.get(utxo_id)
    }

    /// All UTXOs, or those named by `utxo_ids` in the order given.
    /// Unknown ids are skipped.
    pub fn get_all_utxos(&self, utxo_ids: Option<&[String]>) -> Vec<Utxo> {
        match utxo_ids {
            Some(ids) => ids.iter().filter_map(|id| self.utxos.get(id)).cloned().collect(),
            None => self.utxos.values().cloned().collect(),
        }
    }

    /// cb58 strings of [`UtxoSet::get_all_utxos`]
    pub fn get_all_utxo_strings(&self, utxo_ids: Option<&[String]>) -> Result<Vec<String>> {
        self.get_all_utxos(utxo_ids).iter().map(Utxo::to_cb58).collect()
    }

    /// UTXOIDs, optionally filtered by owner.
    ///
    /// With `match_all`, an id matches when its output has owners and all
    /// of them are in `addresses`; otherwise one owner in `addresses` is
    /// enough.
    pub fn get_utxo_ids(&self, addresses: Option<&[Address]>, match_all: bool) -> Vec<String> {
        let addresses = match addresses {
            Some(addresses) => addresses,
            None => return self.utxos.keys().cloned().collect(),
        };

        if match_all {
            return self
                .utxos
                .iter()
                .filter(|(_, utxo)| {
                    utxo.output().map_or(false, |output| {
                        let owners = output.addresses();
                        !owners.is_empty() && owners.iter().all(|a| addresses.contains(a))
                    })
                })
                .map(|(id, _)| id.clone())
                .collect();
        }

        let candidates: HashSet<&String> = addresses
            .iter()
            .filter_map(|address| self.address_utxos.get(address))
            .flatten()
            .collect();
        self.utxos
            .keys()
            .filter(|id| candidates.contains(id))
            .cloned()
            .collect()
    }

    /// Every address referenced by a stored output
    pub fn get_addresses(&self) -> BTreeSet<Address> {
        self.address_utxos.keys().copied().collect()
    }

    /// Sum of amounts for `asset_id` held by any of `addresses` whose
    /// locktime has passed at `as_of` (default: now).
    pub fn get_balance(
        &self,
        addresses: &[Address],
        asset_id: impl Into<AssetRef>,
        as_of: Option<Timestamp>,
    ) -> Result<BigUint> {
        let asset_id = asset_id.into().resolve()?;
        let as_of = as_of.unwrap_or_else(unix_now);

        let mut balance = BigUint::default();
        for id in self.get_utxo_ids(Some(addresses), false) {
            let utxo = match self.utxos.get(&id) {
                Some(utxo) => utxo,
                None => continue,
            };
            if utxo.asset_id() != Some(&asset_id) {
                continue;
            }
            if let Some(output) = utxo.output() {
                if output.locktime() > as_of {
                    continue;
                }
                if let Some(amount) = output.amount() {
                    balance += amount;
                }
            }
        }
        Ok(balance)
    }

    /// Distinct assetIDs, optionally only those held by `addresses`
    pub fn get_asset_ids(&self, addresses: Option<&[Address]>) -> BTreeSet<AssetId> {
        match addresses {
            None => self.asset_utxos.keys().copied().collect(),
            Some(addresses) => self
                .get_utxo_ids(Some(addresses), false)
                .iter()
                .filter_map(|id| self.utxos.get(id))
                .filter_map(|utxo| utxo.asset_id().copied())
                .collect(),
        }
    }

    /// UTXOs whose locktime has passed at `as_of` (default: now)
    pub fn get_consumable_utxos(&self, as_of: Option<Timestamp>) -> Vec<Utxo> {
        let as_of = as_of.unwrap_or_else(unix_now);
        self.utxos
            .values()
            .filter(|utxo| utxo.output().map_or(false, |o| o.locktime() <= as_of))
            .cloned()
            .collect()
    }

    /// UTXOIDs that `addresses` can jointly sign for at `as_of` (default: now)
    pub fn get_spendable_utxo_ids(&self, addresses: &[Address], as_of: Option<Timestamp>) -> Vec<String> {
        let as_of = as_of.unwrap_or_else(unix_now);
        self.get_utxo_ids(Some(addresses), false)
            .into_iter()
            .filter(|id| {
                self.utxos
                    .get(id)
                    .and_then(Utxo::output)
                    .map_or(false, |o| o.owners().meets_threshold(addresses, as_of))
            })
            .collect()
    }

    /// New set holding the UTXOs for which `predicate` holds
    pub fn filter<F>(&self, predicate: F) -> Result<UtxoSet>
    where
        F: Fn(&Utxo) -> bool,
    {
        let mut results = UtxoSet::with_config(self.config.clone());
        results.add_array(self.utxos.values().filter(|utxo| predicate(*utxo)), false)?;
        Ok(results)
    }

    /// Fresh set with this set's UTXOs followed by `other`'s, optionally
    /// restricted to `utxo_ids`. `other` wins on shared ids.
    pub fn merge(&self, other: &UtxoSet, utxo_ids: Option<&[String]>) -> Result<UtxoSet> {
        let mut results = UtxoSet::with_config(self.config.clone());
        results.add_array(self.get_all_utxos(utxo_ids), false)?;
        results.add_array(other.get_all_utxos(utxo_ids), true)?;
        Ok(results)
    }

    /// Build a set from `ids`, taking each UTXO from `other` when present
    fn collect_ids(&self, other: &UtxoSet, ids: Vec<String>) -> Result<UtxoSet> {
        let utxos: Vec<Utxo> = ids
            .iter()
            .filter_map(|id| other.get_utxo(id).or_else(|| self.get_utxo(id)))
            .cloned()
            .collect();
        let mut results = UtxoSet::with_config(self.config.clone());
        results.add_array(utxos, false)?;
        Ok(results)
    }

    pub fn intersection(&self, other: &UtxoSet) -> Result<UtxoSet> {
        let ids: Vec<String> = self
            .utxos
            .keys()
            .filter(|id| other.utxos.contains_key(*id))
            .cloned()
            .collect();
        self.merge(other, Some(ids.as_slice()))
    }

    /// Ids of `self` not in `other`
    pub fn difference(&self, other: &UtxoSet) -> Result<UtxoSet> {
        let ids: Vec<String> = self
            .utxos
            .keys()
            .filter(|id| !other.utxos.contains_key(*id))
            .cloned()
            .collect();
        self.collect_ids(other, ids)
    }

    pub fn sym_difference(&self, other: &UtxoSet) -> Result<UtxoSet> {
        let ids: Vec<String> = self
            .utxos
            .keys()
            .filter(|id| !other.utxos.contains_key(*id))
            .chain(other.utxos.keys().filter(|id| !self.utxos.contains_key(*id)))
            .cloned()
            .collect();
        self.collect_ids(other, ids)
    }

    pub fn union(&self, other: &UtxoSet) -> Result<UtxoSet> {
        self.merge(other, None)
    }

    pub fn merge_with_rule(&self, other: &UtxoSet, rule: MergeRule) -> Result<UtxoSet> {
        let merged = match rule {
            MergeRule::Intersection => self.intersection(other)?,
            MergeRule::DifferenceSelf => self.difference(other)?,
            MergeRule::DifferenceNew => other.difference(self)?,
            MergeRule::SymDifference => self.sym_difference(other)?,
            MergeRule::Union => self.union(other)?,
            MergeRule::UnionMinusNew => self.union(other)?.difference(other)?,
            MergeRule::UnionMinusSelf => self.union(other)?.difference(self)?,
        };
        log::debug!(
            "merge {} of {} and {} utxos produced {}",
            rule,
            self.len(),
            other.len(),
            merged.len()
        );
        Ok(merged)
    }

    /// [`UtxoSet::merge_with_rule`] by rule name; unknown names fail with
    /// [`UtxoError::InvalidRule`]
    pub fn merge_by_rule(&self, other: &UtxoSet, rule: &str) -> Result<UtxoSet> {
        let rule: MergeRule = rule.parse()?;
        self.merge_with_rule(other, rule)
    }

    pub fn serialize(&self, encoding: Encoding) -> Result<UtxoSetDocument> {
        let utxos = self
            .utxos
            .values()
            .map(|utxo| utxo.to_fields(encoding))
            .collect::<Result<Vec<_>>>()?;
        Ok(UtxoSetDocument {
            type_name: UTXO_SET_TYPE_NAME.to_string(),
            encoding,
            utxos,
        })
    }

    pub fn deserialize(document: &UtxoSetDocument) -> Result<UtxoSet> {
        Self::deserialize_with(document, CodecConfig::default())
    }

    pub fn deserialize_with(document: &UtxoSetDocument, config: CodecConfig) -> Result<UtxoSet> {
        if document.type_name != UTXO_SET_TYPE_NAME {
            return Err(UtxoError::Decoding(format!(
                "expected {} document, got {}",
                UTXO_SET_TYPE_NAME, document.type_name
            )));
        }
        let mut set = UtxoSet::with_config(config);
        for fields in &document.utxos {
            let utxo = Utxo::from_fields(fields, document.encoding, &set.config)?;
            if set.add(utxo, false)?.is_skipped() {
                return Err(UtxoError::Decoding(format!(
                    "duplicate utxo_id {} in document",
                    fields.utxo_id
                )));
            }
        }
        Ok(set)
    }

    pub fn to_json(&self, encoding: Encoding) -> Result<String> {
        serde_json::to_string(&self.serialize(encoding)?)
            .map_err(|e| UtxoError::Encoding(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<UtxoSet> {
        Self::from_json_with(json, CodecConfig::default())
    }

    pub fn from_json_with(json: &str, config: CodecConfig) -> Result<UtxoSet> {
        let document: UtxoSetDocument =
            serde_json::from_str(json).map_err(|e| UtxoError::Decoding(e.to_string()))?;
        Self::deserialize_with(&document, config)
    }
}

/// Equal when both sets hold the same UTXOIDs with the same UTXO content,
/// regardless of insertion order
impl PartialEq for UtxoSet {
    fn eq(&self, other: &Self) -> bool {
        self.utxos.len() == other.utxos.len()
            && self
                .utxos
                .iter()
                .all(|(id, utxo)| other.utxos.get(id) == Some(utxo))
    }
}

impl Eq for UtxoSet {}
