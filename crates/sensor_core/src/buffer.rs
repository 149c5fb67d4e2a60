//! Buffer circular de agregação.
//!
//! Guarda as últimas [`CAPACITY`] amostras. Quando cheio, cada `push`
//! sobrescreve a mais antiga. O canal de agregação lê um [`snapshot`] e
//! só chama [`reset`] depois de publicar com sucesso.
//!
//! [`snapshot`]: AggregationBuffer::snapshot
//! [`reset`]: AggregationBuffer::reset

use crate::types::{AggregateStats, Sample};

/// Capacidade fixa (15 amostras × 2 s = 30 s de dados).
pub const CAPACITY: usize = 15;

#[derive(Debug, Clone)]
pub struct AggregationBuffer {
    entries: [Sample; CAPACITY],
    count: usize,
    write_index: usize,
}

impl Default for AggregationBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationBuffer {
    pub fn new() -> Self {
        Self {
            entries: [Sample::default(); CAPACITY],
            count: 0,
            write_index: 0,
        }
    }

    /// Insere uma amostra, sobrescrevendo a mais antiga se o buffer estiver cheio.
    pub fn push(&mut self, sample: Sample) {
        self.entries[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % CAPACITY;
        if self.count < CAPACITY {
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Amostras válidas, da mais antiga para a mais recente.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        let start = (self.write_index + CAPACITY - self.count) % CAPACITY;
        (0..self.count).map(move |i| &self.entries[(start + i) % CAPACITY])
    }

    /// Estatísticas sobre as `count` amostras válidas. `None` se vazio.
    pub fn snapshot(&self) -> Option<AggregateStats> {
        if self.count == 0 {
            return None;
        }

        let mut sum_co2 = 0i64;
        let mut sum_humidity = 0i64;
        let mut max_co2 = i32::MIN;
        let mut min_co2 = i32::MAX;
        let mut max_humidity = i32::MIN;
        let mut min_humidity = i32::MAX;

        for s in self.iter() {
            sum_co2 += i64::from(s.co2);
            sum_humidity += i64::from(s.humidity);
            max_co2 = max_co2.max(s.co2);
            min_co2 = min_co2.min(s.co2);
            max_humidity = max_humidity.max(s.humidity);
            min_humidity = min_humidity.min(s.humidity);
        }

        let n = self.count as f64;
        Some(AggregateStats {
            avg_co2: sum_co2 as f64 / n,
            max_co2,
            min_co2,
            avg_humidity: sum_humidity as f64 / n,
            max_humidity,
            min_humidity,
            samples: self.count,
        })
    }

    /// Descarta logicamente todas as amostras. O armazenamento é reaproveitado.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn co2_only(values: &[i32]) -> AggregationBuffer {
        let mut buf = AggregationBuffer::new();
        for &v in values {
            buf.push(Sample::new(v, 50));
        }
        buf
    }

    #[test]
    fn empty_snapshot_is_none() {
        let buf = AggregationBuffer::new();
        assert!(buf.is_empty());
        assert!(buf.snapshot().is_none());
    }

    #[test]
    fn three_sample_stats() {
        let buf = co2_only(&[400, 500, 600]);
        let stats = buf.snapshot().unwrap();
        assert_eq!(stats.avg_co2, 500.0);
        assert_eq!(stats.max_co2, 600);
        assert_eq!(stats.min_co2, 400);
        assert_eq!(stats.avg_humidity, 50.0);
        assert_eq!(stats.samples, 3);
    }

    #[test]
    fn average_uses_stored_count_not_capacity() {
        let mut buf = AggregationBuffer::new();
        buf.push(Sample::new(1000, 20));
        buf.push(Sample::new(2000, 41));
        let stats = buf.snapshot().unwrap();
        assert_eq!(stats.avg_co2, 1500.0);
        assert_eq!(stats.avg_humidity, 30.5);
        assert_eq!(stats.min_humidity, 20);
        assert_eq!(stats.max_humidity, 41);
    }

    #[test]
    fn count_never_exceeds_capacity() {
        let mut buf = AggregationBuffer::new();
        for i in 0..(CAPACITY * 3 + 2) {
            buf.push(Sample::new(i as i32, 0));
            assert!(buf.len() <= CAPACITY);
        }
        assert_eq!(buf.len(), CAPACITY);
    }

    #[test]
    fn overrun_keeps_most_recent_window() {
        let k = 7;
        let values: Vec<i32> = (0..(CAPACITY + k) as i32).collect();
        let buf = co2_only(&values);

        let kept: Vec<i32> = buf.iter().map(|s| s.co2).collect();
        let expected: Vec<i32> = values[k..].to_vec();
        assert_eq!(kept, expected);

        let stats = buf.snapshot().unwrap();
        assert_eq!(stats.min_co2, k as i32);
        assert_eq!(stats.max_co2, (CAPACITY + k - 1) as i32);
    }

    #[test]
    fn reset_empties_and_buffer_is_reusable() {
        let mut buf = co2_only(&[900, 950]);
        buf.reset();
        assert!(buf.snapshot().is_none());
        assert_eq!(buf.iter().count(), 0);

        buf.push(Sample::new(1200, 60));
        let stats = buf.snapshot().unwrap();
        assert_eq!(stats.samples, 1);
        assert_eq!(stats.avg_co2, 1200.0);
    }
}
