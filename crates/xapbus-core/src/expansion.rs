// ── Expansion bus ──
//
// Twelve inter-unit channels, lettered O through Z, present on every unit
// regardless of model. Each has an independent input and output label.

use std::collections::BTreeSet;
use std::fmt;

use xapbus_api::{BusDirection, BusLetter, Link, Parameter, Target, UnitAddress};

use crate::error::CoreError;
use crate::model::{ExpansionLabels, ExpansionSnapshot};

/// State mirror for one expansion bus channel.
#[derive(Debug, Clone)]
pub struct ExpansionBusChannel {
    link: Link,
    unit: UnitAddress,
    letter: BusLetter,
    labels: ExpansionLabels,
}

impl ExpansionBusChannel {
    pub fn new(link: Link, unit: UnitAddress, letter: BusLetter) -> Self {
        Self {
            link,
            unit,
            letter,
            labels: ExpansionLabels::default(),
        }
    }

    pub fn unit(&self) -> UnitAddress {
        self.unit
    }

    pub fn letter(&self) -> BusLetter {
        self.letter
    }

    pub fn labels(&self) -> &ExpansionLabels {
        &self.labels
    }

    pub fn in_use(&self) -> bool {
        self.labels.in_use
    }

    pub(crate) fn set_in_use(&mut self, in_use: bool) {
        self.labels.in_use = in_use;
    }

    pub fn snapshot(&self) -> ExpansionSnapshot {
        ExpansionSnapshot {
            letter: self.letter.as_char(),
            labels: self.labels.clone(),
        }
    }

    fn target(&self, direction: BusDirection) -> Target {
        Target::Expansion {
            bus: self.letter,
            direction,
        }
    }

    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        self.get_input_label().await?;
        self.get_output_label().await?;
        Ok(())
    }

    pub async fn get_input_label(&mut self) -> Result<String, CoreError> {
        let label: String = self
            .link
            .get(self.unit, Parameter::Label, self.target(BusDirection::In))
            .await?;
        self.labels.input_label = Some(label.clone());
        Ok(label)
    }

    pub async fn set_input_label(&mut self, label: &str) -> Result<String, CoreError> {
        let confirmed = self
            .link
            .set(
                self.unit,
                Parameter::Label,
                self.target(BusDirection::In),
                label.to_owned(),
            )
            .await?;
        self.labels.input_label = Some(confirmed.clone());
        Ok(confirmed)
    }

    pub async fn get_output_label(&mut self) -> Result<String, CoreError> {
        let label: String = self
            .link
            .get(self.unit, Parameter::Label, self.target(BusDirection::Out))
            .await?;
        self.labels.output_label = Some(label.clone());
        Ok(label)
    }

    pub async fn set_output_label(&mut self, label: &str) -> Result<String, CoreError> {
        let confirmed = self
            .link
            .set(
                self.unit,
                Parameter::Label,
                self.target(BusDirection::Out),
                label.to_owned(),
            )
            .await?;
        self.labels.output_label = Some(confirmed.clone());
        Ok(confirmed)
    }
}

impl fmt::Display for ExpansionBusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Expansion {}:{} | in: {} | out: {}",
            self.unit,
            self.letter,
            self.labels.input_label.as_deref().unwrap_or("-"),
            self.labels.output_label.as_deref().unwrap_or("-"),
        )
    }
}

// ── Allocator ───────────────────────────────────────────────────────

/// Tracks which expansion bus letters are taken on one unit.
///
/// Every letter is in exactly one of `used`, `unused` or `reserved`.
#[derive(Debug, Clone)]
pub struct ExpansionBusAllocator {
    unit: UnitAddress,
    used: BTreeSet<BusLetter>,
    unused: BTreeSet<BusLetter>,
    reserved: BTreeSet<BusLetter>,
}

impl ExpansionBusAllocator {
    pub fn new(unit: UnitAddress) -> Self {
        Self {
            unit,
            used: BTreeSet::new(),
            unused: BusLetter::ALL.into_iter().collect(),
            reserved: BTreeSet::new(),
        }
    }

    pub fn used(&self) -> &BTreeSet<BusLetter> {
        &self.used
    }

    pub fn unused(&self) -> &BTreeSet<BusLetter> {
        &self.unused
    }

    pub fn reserved(&self) -> &BTreeSet<BusLetter> {
        &self.reserved
    }

    pub fn is_available(&self, letter: BusLetter) -> bool {
        self.unused.contains(&letter)
    }

    /// Take the lowest free letter.
    pub fn request(&mut self) -> Result<BusLetter, CoreError> {
        let letter = self
            .unused
            .pop_first()
            .ok_or(CoreError::ExpansionExhausted {
                unit: self.unit.get(),
            })?;
        self.used.insert(letter);
        Ok(letter)
    }

    /// Hold a letter back from `request`.
    pub fn reserve(&mut self, letter: BusLetter) -> Result<(), CoreError> {
        if self.used.contains(&letter) {
            return Err(CoreError::ExpansionConflict {
                letter: letter.as_char(),
                state: "in use".into(),
            });
        }
        self.unused.remove(&letter);
        self.reserved.insert(letter);
        Ok(())
    }

    /// Return a used or reserved letter to the free pool.
    pub fn release(&mut self, letter: BusLetter) -> Result<(), CoreError> {
        if self.used.remove(&letter) || self.reserved.remove(&letter) {
            self.unused.insert(letter);
            return Ok(());
        }
        Err(CoreError::ExpansionConflict {
            letter: letter.as_char(),
            state: "not allocated".into(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn letter(c: char) -> BusLetter {
        BusLetter::new(c).unwrap()
    }

    fn allocator() -> ExpansionBusAllocator {
        ExpansionBusAllocator::new(UnitAddress::new(2).unwrap())
    }

    #[test]
    fn starts_with_every_letter_free() {
        let alloc = allocator();
        assert_eq!(alloc.unused().len(), 12);
        assert!(alloc.used().is_empty());
        assert!(alloc.reserved().is_empty());
    }

    #[test]
    fn hands_out_lowest_letter_then_exhausts() {
        let mut alloc = allocator();
        let first = alloc.request().unwrap();
        assert_eq!(first, letter('O'));

        for _ in 1..12 {
            alloc.request().unwrap();
        }
        assert_eq!(alloc.used().len(), 12);

        let err = alloc.request().unwrap_err();
        assert!(matches!(err, CoreError::ExpansionExhausted { unit: 2 }));
    }

    #[test]
    fn skips_reserved_letters() {
        let mut alloc = allocator();
        alloc.reserve(letter('O')).unwrap();
        alloc.reserve(letter('P')).unwrap();

        assert_eq!(alloc.request().unwrap(), letter('Q'));
        assert!(!alloc.is_available(letter('O')));
    }

    #[test]
    fn cannot_reserve_a_used_letter() {
        let mut alloc = allocator();
        let taken = alloc.request().unwrap();
        assert!(matches!(
            alloc.reserve(taken),
            Err(CoreError::ExpansionConflict { .. })
        ));
    }

    #[test]
    fn release_returns_letter_to_pool() {
        let mut alloc = allocator();
        let taken = alloc.request().unwrap();
        alloc.release(taken).unwrap();

        assert!(alloc.is_available(taken));
        assert_eq!(alloc.request().unwrap(), taken);
    }

    #[test]
    fn releasing_a_free_letter_is_an_error() {
        let mut alloc = allocator();
        assert!(alloc.release(letter('Z')).is_err());
    }
}
