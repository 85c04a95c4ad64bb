//! Population bookkeeping: which share of each household group is on which tariff.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::tariff::{PowerType, TariffId};

use super::ShiftingGroup;

/// Customers of one group subscribed to one tariff for one power type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub group: ShiftingGroup,
    pub power_type: PowerType,
    pub tariff: TariffId,
    pub customers: usize,
    /// Energy billed under this subscription so far (kWh).
    pub cumulative_kwh: f64,
}

type Key = (ShiftingGroup, PowerType, TariffId);

/// All subscriptions of a village.
///
/// For every group and power type the subscribed customers add up to at most
/// the group's size; moves never create or destroy customers.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionBook {
    entries: BTreeMap<Key, Subscription>,
}

impl SubscriptionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` customers of `group` to `tariff`.
    pub fn subscribe(
        &mut self,
        group: ShiftingGroup,
        power_type: PowerType,
        tariff: TariffId,
        count: usize,
    ) {
        if count == 0 {
            return;
        }
        self.entries
            .entry((group, power_type, tariff))
            .or_insert_with(|| Subscription {
                group,
                power_type,
                tariff,
                customers: 0,
                cumulative_kwh: 0.0,
            })
            .customers += count;
    }

    /// Removes up to `count` customers; never goes below zero.
    ///
    /// # Returns
    ///
    /// The number of customers actually removed.
    pub fn unsubscribe(
        &mut self,
        group: ShiftingGroup,
        power_type: PowerType,
        tariff: TariffId,
        count: usize,
    ) -> usize {
        let key = (group, power_type, tariff);
        let Some(sub) = self.entries.get_mut(&key) else {
            return 0;
        };
        let removed = count.min(sub.customers);
        sub.customers -= removed;
        if sub.customers == 0 {
            self.entries.remove(&key);
        }
        removed
    }

    /// Moves exactly `count` customers of `group` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// `Subscription` if fewer than `count` customers are on `from`.
    pub fn transfer(
        &mut self,
        group: ShiftingGroup,
        power_type: PowerType,
        from: TariffId,
        to: TariffId,
        count: usize,
    ) -> EngineResult<usize> {
        let available = self.customers(group, power_type, from);
        if count > available {
            return Err(EngineError::Subscription(format!(
                "cannot move {count} {group} customers from {from}: only {available} subscribed"
            )));
        }
        if from == to || count == 0 {
            return Ok(0);
        }
        let removed = self.unsubscribe(group, power_type, from, count);
        self.subscribe(group, power_type, to, removed);
        Ok(removed)
    }

    /// Moves every customer of `group` on `from` to `to`.
    pub fn transfer_all(
        &mut self,
        group: ShiftingGroup,
        power_type: PowerType,
        from: TariffId,
        to: TariffId,
    ) -> usize {
        let count = self.customers(group, power_type, from);
        self.transfer(group, power_type, from, to, count).unwrap_or(0)
    }

    pub fn customers(
        &self,
        group: ShiftingGroup,
        power_type: PowerType,
        tariff: TariffId,
    ) -> usize {
        self.entries
            .get(&(group, power_type, tariff))
            .map_or(0, |s| s.customers)
    }

    /// Customers of all groups on `tariff`.
    pub fn population(&self, power_type: PowerType, tariff: TariffId) -> usize {
        self.entries
            .values()
            .filter(|s| s.power_type == power_type && s.tariff == tariff)
            .map(|s| s.customers)
            .sum()
    }

    /// Subscribed customers of one group and power type.
    pub fn group_population(&self, group: ShiftingGroup, power_type: PowerType) -> usize {
        self.for_group(group, power_type).map(|s| s.customers).sum()
    }

    pub fn for_group(
        &self,
        group: ShiftingGroup,
        power_type: PowerType,
    ) -> impl Iterator<Item = &Subscription> {
        self.entries
            .values()
            .filter(move |s| s.group == group && s.power_type == power_type)
    }

    pub fn for_group_mut(
        &mut self,
        group: ShiftingGroup,
        power_type: PowerType,
    ) -> impl Iterator<Item = &mut Subscription> {
        self.entries
            .values_mut()
            .filter(move |s| s.group == group && s.power_type == power_type)
    }

    /// Tariff holding most of a group's customers; ties go to the lowest id.
    pub fn dominant_tariff(&self, group: ShiftingGroup, power_type: PowerType) -> Option<TariffId> {
        let mut best: Option<(TariffId, usize)> = None;
        for sub in self.for_group(group, power_type) {
            if best.is_none_or(|(_, n)| sub.customers > n) {
                best = Some((sub.tariff, sub.customers));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Distinct tariffs referenced by any subscription.
    pub fn tariffs(&self) -> Vec<(PowerType, TariffId)> {
        let mut out: Vec<(PowerType, TariffId)> = self
            .entries
            .values()
            .map(|s| (s.power_type, s.tariff))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: TariffId = TariffId(1);
    const B: TariffId = TariffId(2);
    const PT: PowerType = PowerType::Consumption;

    #[test]
    fn transfer_conserves_population() {
        let mut book = SubscriptionBook::new();
        book.subscribe(ShiftingGroup::Ns, PT, A, 10);
        let before_a = book.population(PT, A);
        let before_b = book.population(PT, B);
        book.transfer(ShiftingGroup::Ns, PT, A, B, 4).unwrap();
        let delta_a = book.population(PT, A) as i64 - before_a as i64;
        let delta_b = book.population(PT, B) as i64 - before_b as i64;
        assert_eq!(delta_a, -delta_b);
        assert_eq!(delta_b, 4);
    }

    #[test]
    fn over_draw_is_rejected() {
        let mut book = SubscriptionBook::new();
        book.subscribe(ShiftingGroup::Ss, PT, A, 3);
        let err = book.transfer(ShiftingGroup::Ss, PT, A, B, 4);
        assert!(matches!(err, Err(EngineError::Subscription(_))));
        assert_eq!(book.customers(ShiftingGroup::Ss, PT, A), 3);
    }

    #[test]
    fn unsubscribe_clamps_at_zero() {
        let mut book = SubscriptionBook::new();
        book.subscribe(ShiftingGroup::Ras, PT, A, 2);
        assert_eq!(book.unsubscribe(ShiftingGroup::Ras, PT, A, 5), 2);
        assert_eq!(book.customers(ShiftingGroup::Ras, PT, A), 0);
        assert!(book.tariffs().is_empty());
    }

    #[test]
    fn dominant_tariff_prefers_larger_share() {
        let mut book = SubscriptionBook::new();
        book.subscribe(ShiftingGroup::Res, PT, A, 2);
        book.subscribe(ShiftingGroup::Res, PT, B, 5);
        assert_eq!(book.dominant_tariff(ShiftingGroup::Res, PT), Some(B));
        assert_eq!(book.dominant_tariff(ShiftingGroup::Ns, PT), None);
    }
}
