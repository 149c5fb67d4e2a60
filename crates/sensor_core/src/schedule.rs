//! Temporizador de canal: intervalo fixo + timestamp do último disparo.

/// Como o relógio do canal é reiniciado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Reinicia em toda checagem vencida, com ou sem ação.
    Periodic,
    /// Reinicia só quando o canal efetivamente age.
    Cooldown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    kind: ScheduleKind,
    interval_ms: u64,
    last_fire: u64,
}

impl Schedule {
    pub fn periodic(interval_ms: u64) -> Self {
        Self {
            kind: ScheduleKind::Periodic,
            interval_ms,
            last_fire: 0,
        }
    }

    pub fn cooldown(interval_ms: u64) -> Self {
        Self {
            kind: ScheduleKind::Cooldown,
            interval_ms,
            last_fire: 0,
        }
    }

    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn last_fire(&self) -> u64 {
        self.last_fire
    }

    /// `now - last_fire >= interval`.
    pub fn is_due(&self, now: u64) -> bool {
        now.saturating_sub(self.last_fire) >= self.interval_ms
    }

    /// Checagem do tick. Em canais periódicos, uma checagem vencida já
    /// reinicia o relógio.
    pub fn check(&mut self, now: u64) -> bool {
        let due = self.is_due(now);
        if due && self.kind == ScheduleKind::Periodic {
            self.last_fire = now;
        }
        due
    }

    /// Registra que o canal agiu em `now`.
    pub fn mark_fired(&mut self, now: u64) {
        self.last_fire = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_predicate() {
        let s = Schedule::periodic(15_000);
        assert!(!s.is_due(14_999));
        assert!(s.is_due(15_000));
    }

    #[test]
    fn periodic_resets_on_due_check() {
        let mut s = Schedule::periodic(1_000);
        assert!(s.check(1_000));
        assert_eq!(s.last_fire(), 1_000);
        assert!(!s.check(1_999));
        assert!(s.check(2_000));
    }

    #[test]
    fn cooldown_only_resets_when_marked() {
        let mut s = Schedule::cooldown(30_000);
        assert!(s.check(30_000));
        // Sem ação: continua vencido no próximo tick
        assert!(s.check(31_000));
        s.mark_fired(31_000);
        assert!(!s.check(60_999));
        assert!(s.check(61_000));
    }

    #[test]
    fn clock_going_backwards_is_not_due() {
        let mut s = Schedule::periodic(100);
        s.mark_fired(5_000);
        assert!(!s.is_due(10));
    }
}
