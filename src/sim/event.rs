use crate::tariff::{RateTariff, TariffId};

/// Tariff market change scheduled for the start of a day.
#[derive(Debug, Clone)]
pub enum MarketAction {
    /// Publish a new tariff; villages re-evaluate their subscriptions.
    Publish(RateTariff),
    /// Revoke a published tariff; subscribers migrate on the next activation.
    Revoke(TariffId),
}

/// A market action applied before the first activation of `day`.
#[derive(Debug, Clone)]
pub struct MarketEvent {
    /// Day of the run (0-based).
    pub day: usize,
    pub action: MarketAction,
}

impl MarketEvent {
    pub fn publish(day: usize, tariff: RateTariff) -> Self {
        Self {
            day,
            action: MarketAction::Publish(tariff),
        }
    }

    pub fn revoke(day: usize, tariff: TariffId) -> Self {
        Self {
            day,
            action: MarketAction::Revoke(tariff),
        }
    }

    /// Returns `true` when the event fires on `day`.
    pub fn is_due(&self, day: usize) -> bool {
        self.day == day
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::{PowerType, Tariff};

    #[test]
    fn due_only_on_its_day() {
        let event = MarketEvent::revoke(3, TariffId(2));
        assert!(!event.is_due(2));
        assert!(event.is_due(3));
        assert!(!event.is_due(4));
    }

    #[test]
    fn publish_carries_the_tariff() {
        let tariff = RateTariff::flat(TariffId(7), "broker", PowerType::Consumption, 0.08);
        let event = MarketEvent::publish(1, tariff);
        assert!(matches!(event.action, MarketAction::Publish(ref t) if t.id() == TariffId(7)));
    }
}
