//! Directional Airtime (DAT) link metric (spec.md §4.6): a packet-loss-
//! and link-rate-aware metric sampled once per NHDP interface refresh
//! cycle, grounded on
//! `examples/original_source/src/nhdp/ff_dat_metric/ff_dat_metric.c`'s
//! bucket-ring and loss-combiner design.

use oonf_rfc5444::{encode_metric, RFC7181_METRIC_MAX, RFC7181_METRIC_MIN};

use crate::constants::DAT_RING_BUCKETS;

const LINKSPEED_RANGE: u64 = 1_000;
const HYSTERESIS_WINDOW: u32 = 100;

#[derive(Debug, Clone, Copy, Default)]
pub struct Bucket {
    pub received: u32,
    pub total: u32,
    pub raw_rx_bitrate: Option<u64>,
}

/// Combines the three success signals of spec.md §4.6 into one value. The
/// default is equal-weight averaging (see DESIGN.md's Open Question
/// resolution); swap in a different [`LossCombiner`] to weight e.g. the
/// probed sample over a stale layer2-reported one.
pub trait LossCombiner {
    fn combine(&self, signals: &[u32]) -> u32;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EqualWeightCombiner;

impl LossCombiner for EqualWeightCombiner {
    fn combine(&self, signals: &[u32]) -> u32 {
        if signals.is_empty() {
            return 1000;
        }
        (signals.iter().map(|&s| s as u64).sum::<u64>() / signals.len() as u64) as u32
    }
}

/// Per-link DAT sampler state: a 32-bucket ring of received/total packet
/// counts, the last-seen packet sequence number, the missed-HELLO counter
/// and the previous reported loss rate (for hysteresis).
pub struct DatMetric {
    buckets: Vec<Bucket>,
    active: usize,
    last_seqno: Option<u16>,
    missed_hellos: u32,
    last_loss_rate_scaled: u32,
    last_metric_in: u32,
    mic_enabled: bool,
    fixed_exponent: Option<u8>,
}

impl DatMetric {
    pub fn new() -> Self {
        Self::with_buckets(DAT_RING_BUCKETS)
    }

    pub fn with_buckets(n: usize) -> Self {
        Self {
            buckets: vec![Bucket::default(); n.max(1)],
            active: 0,
            last_seqno: None,
            missed_hellos: 0,
            last_loss_rate_scaled: 0,
            last_metric_in: RFC7181_METRIC_MAX,
            mic_enabled: true,
            fixed_exponent: None,
        }
    }

    pub fn set_mic_enabled(&mut self, enabled: bool) {
        self.mic_enabled = enabled;
    }

    pub fn set_fixed_exponent(&mut self, exponent: Option<u8>) {
        self.fixed_exponent = exponent;
    }

    /// Records one received packet carrying `seqno`: bumps the active
    /// bucket's `received` by one and its `total` by the wrapped gap since
    /// the last-seen sequence number (spec.md §4.6).
    pub fn on_packet_received(&mut self, seqno: u16) {
        let delta = match self.last_seqno {
            Some(prev) => seqno.wrapping_sub(prev) as u32,
            None => 1,
        };
        self.last_seqno = Some(seqno);
        let bucket = &mut self.buckets[self.active];
        bucket.received += 1;
        bucket.total += delta.max(1);
    }

    /// Hello-lost-timer expiry: one more HELLO interval passed with
    /// nothing received.
    pub fn on_hello_lost(&mut self) {
        self.missed_hellos += 1;
    }

    pub fn on_hello_heard(&mut self) {
        self.missed_hellos = 0;
    }

    /// Closes the active bucket (reading its raw-rx-bitrate) and advances
    /// to the next one, wrapping around the ring.
    pub fn close_bucket(&mut self, raw_rx_bitrate: Option<u64>) {
        self.buckets[self.active].raw_rx_bitrate = raw_rx_bitrate;
        self.active = (self.active + 1) % self.buckets.len();
        self.buckets[self.active] = Bucket::default();
    }

    fn median_nonzero_bitrate(&self) -> Option<u64> {
        let mut rates: Vec<u64> = self.buckets.iter().filter_map(|b| b.raw_rx_bitrate).filter(|&r| r > 0).collect();
        if rates.is_empty() {
            return None;
        }
        rates.sort_unstable();
        Some(rates[rates.len() / 2])
    }

    fn effective_received_total(&self) -> (u64, u64) {
        let received: u64 = self.buckets.iter().map(|b| b.received as u64).sum();
        let total: u64 = self.buckets.iter().map(|b| b.total as u64).sum();
        if self.missed_hellos == 0 {
            return (received, total);
        }
        let n = self.buckets.len() as u64;
        let missed = (self.missed_hellos as u64).min(n);
        let scaled = received.saturating_mul(n.saturating_sub(missed)) / n.max(1);
        (scaled, total)
    }

    fn bitrate_cost(&self) -> u32 {
        match self.median_nonzero_bitrate() {
            Some(rate) if rate > 0 => {
                let inverted = (1000u64 * LINKSPEED_RANGE) / rate.max(1);
                inverted.clamp(1, LINKSPEED_RANGE) as u32
            }
            _ => LINKSPEED_RANGE as u32,
        }
    }

    fn probed_success(&self) -> Option<u32> {
        let (received, total) = self.effective_received_total();
        if total == 0 || received * (LINKSPEED_RANGE) <= total {
            return None;
        }
        Some(((1000 * received) / total.max(1)) as u32)
    }

    /// Computes the current loss-cost, combining the probed success rate
    /// with any higher-priority layer2-reported signals the caller already
    /// looked up (broadcast-loss and RLQ, spec.md §4.6), then applies the
    /// local-link-neighborhood exponent and hysteresis.
    fn loss_cost(
        &mut self,
        l2_broadcast_success: Option<u32>,
        l2_rlq: Option<u32>,
        neighborhood_size: usize,
        combiner: &impl LossCombiner,
    ) -> u32 {
        let mut signals = Vec::with_capacity(3);
        if let Some(probed) = self.probed_success() {
            signals.push(probed);
        }
        if let Some(bcast) = l2_broadcast_success {
            signals.push(bcast);
        }
        if let Some(rlq) = l2_rlq {
            signals.push(rlq);
        }
        let success_scaled = combiner.combine(&signals).max(1);

        let exponent = self.fixed_exponent.unwrap_or_else(|| dynamic_exponent(neighborhood_size));
        let raised = pow_scaled_1000(success_scaled, exponent);
        let raw_cost = (1_000_000u64 / raised.max(1) as u64) as u32;

        let hysteresis_applied = if self.last_loss_rate_scaled != 0
            && raw_cost.abs_diff(self.last_loss_rate_scaled) <= HYSTERESIS_WINDOW
        {
            self.last_loss_rate_scaled
        } else {
            raw_cost
        };
        self.last_loss_rate_scaled = hysteresis_applied;
        hysteresis_applied
    }

    /// Runs one full metric computation (spec.md §4.6's full formula) and
    /// returns the RFC7181-quantized metric-in byte plus the decoded value
    /// that should be stored as `metric_in` on the owning link/neighbor.
    pub fn compute(
        &mut self,
        l2_broadcast_success: Option<u32>,
        l2_rlq: Option<u32>,
        l2_throughput_cost: Option<u32>,
        neighborhood_size: usize,
        combiner: &impl LossCombiner,
    ) -> (u8, u32) {
        let bitrate_cost = self.bitrate_cost();
        let loss_cost = self.loss_cost(l2_broadcast_success, l2_rlq, neighborhood_size, combiner);

        let throughput_cost = l2_throughput_cost.unwrap_or_else(|| {
            if self.median_nonzero_bitrate().is_some() {
                (bitrate_cost as u64 * loss_cost as u64 / 1000) as u32
            } else {
                loss_cost
            }
        });

        let mic_cost = if self.mic_enabled && neighborhood_size > 1 {
            (neighborhood_size as u64 * 1000) as u32
        } else {
            1000
        };

        let final_raw = ((throughput_cost as u64 * mic_cost as u64) / 1_000_000).max(RFC7181_METRIC_MIN as u64);
        let clamped = (final_raw as u32).clamp(RFC7181_METRIC_MIN, RFC7181_METRIC_MAX);
        let encoded = encode_metric(clamped);
        self.last_metric_in = oonf_rfc5444::decode_metric(encoded);
        (encoded, self.last_metric_in)
    }

    pub fn last_metric_in(&self) -> u32 {
        self.last_metric_in
    }
}

impl Default for DatMetric {
    fn default() -> Self {
        Self::new()
    }
}

fn dynamic_exponent(neighborhood_size: usize) -> u8 {
    match neighborhood_size {
        0..=4 => 1,
        5..=15 => 2,
        _ => 3,
    }
}

/// `(success_scaled/1000)^exponent`, kept in the same ×1000 fixed-point
/// scale, matching the original's `success_scaled_by_1000` power series.
fn pow_scaled_1000(success_scaled: u32, exponent: u8) -> u32 {
    let mut acc = 1000u64;
    for _ in 0..exponent.max(1) {
        acc = acc * success_scaled as u64 / 1000;
    }
    acc.max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_link_yields_minimal_loss_cost() {
        let mut dat = DatMetric::new();
        dat.set_fixed_exponent(Some(1));
        for seq in 0..20u16 {
            dat.on_packet_received(seq);
        }
        dat.close_bucket(Some(1_000_000));
        let (_, metric_in) = dat.compute(None, None, None, 2, &EqualWeightCombiner);
        assert!(metric_in < RFC7181_METRIC_MAX);
    }

    #[test]
    fn heavy_loss_raises_metric() {
        let mut good = DatMetric::new();
        good.set_fixed_exponent(Some(1));
        for seq in 0..20u16 {
            good.on_packet_received(seq);
        }
        good.close_bucket(Some(1_000_000));
        let (_, good_metric) = good.compute(None, None, None, 2, &EqualWeightCombiner);

        let mut lossy = DatMetric::new();
        lossy.set_fixed_exponent(Some(1));
        // Every third sequence number observed: ~66% loss.
        for seq in (0..60u16).step_by(3) {
            lossy.on_packet_received(seq);
        }
        lossy.close_bucket(Some(1_000_000));
        let (_, lossy_metric) = lossy.compute(None, None, None, 2, &EqualWeightCombiner);

        assert!(lossy_metric > good_metric);
    }

    #[test]
    fn missed_hellos_scale_down_effective_received_count() {
        let mut dat = DatMetric::new();
        for seq in 0..10u16 {
            dat.on_packet_received(seq);
        }
        let (received_before, _) = dat.effective_received_total();
        dat.on_hello_lost();
        dat.on_hello_lost();
        let (received_after, _) = dat.effective_received_total();
        assert!(received_after < received_before);
    }

    #[test]
    fn mic_penalty_applies_only_above_one_neighbor() {
        let mut solo = DatMetric::new();
        solo.set_fixed_exponent(Some(1));
        for seq in 0..20u16 {
            solo.on_packet_received(seq);
        }
        solo.close_bucket(Some(1_000_000));
        let (_, solo_metric) = solo.compute(None, None, None, 1, &EqualWeightCombiner);

        let mut crowded = DatMetric::new();
        crowded.set_fixed_exponent(Some(1));
        for seq in 0..20u16 {
            crowded.on_packet_received(seq);
        }
        crowded.close_bucket(Some(1_000_000));
        let (_, crowded_metric) = crowded.compute(None, None, None, 10, &EqualWeightCombiner);

        assert!(crowded_metric > solo_metric);
    }
}
