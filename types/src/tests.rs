use super::*;
use commonware_codec::{Encode, ReadExt};
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    Signer,
};
use proptest::prelude::*;

fn participant(seed: u64) -> PublicKey {
    PrivateKey::from_seed(seed).public_key()
}

fn stake(seed: u64, number: u8, amount: u64) -> Stake {
    Stake {
        participant: participant(seed),
        number,
        amount,
    }
}

#[test]
fn test_stake_roundtrip() {
    let stake = stake(1, 7, 250);
    let encoded = stake.encode();
    let decoded = Stake::read(&mut &encoded[..]).unwrap();
    assert_eq!(stake, decoded);
}

#[test]
fn test_stake_decode_rejects_bad_number() {
    let stake = stake(1, NUMBER_COUNT as u8, 250);
    let encoded = stake.encode();
    assert!(Stake::read(&mut &encoded[..]).is_err());
}

#[test]
fn test_stake_decode_rejects_zero_amount() {
    let stake = stake(1, 3, 0);
    let encoded = stake.encode();
    assert!(Stake::read(&mut &encoded[..]).is_err());
}

#[test]
fn test_round_roundtrip() {
    let mut round = Round::new(4);
    round.record_stake(stake(1, 3, 100)).unwrap();
    round.record_stake(stake(2, 3, 50)).unwrap();
    round.record_stake(stake(3, 7, 20)).unwrap();
    round.validate_invariants().expect("valid invariants");

    let encoded = round.encode();
    let decoded = Round::read(&mut &encoded[..]).unwrap();
    assert_eq!(round, decoded);

    // Derived tallies are rebuilt on decode.
    assert_eq!(decoded.total_staked, 170);
    assert_eq!(decoded.total_on(3), 150);
    assert_eq!(decoded.total_on(7), 20);
}

#[test]
fn test_settled_round_roundtrip() {
    let mut round = Round::new(0);
    round.record_stake(stake(1, 9, 40)).unwrap();
    round.winning_number = Some(9);

    let encoded = round.encode();
    let decoded = Round::read(&mut &encoded[..]).unwrap();
    assert_eq!(round, decoded);
    assert!(!decoded.is_open());
}

#[test]
fn test_round_decode_rejects_bad_winning_number() {
    let mut round = Round::new(0);
    round.winning_number = Some(NUMBER_COUNT as u8);
    let encoded = round.encode();
    assert!(Round::read(&mut &encoded[..]).is_err());
}

#[test]
fn test_round_decode_rejects_duplicate_participant() {
    let mut round = Round::new(0);
    round.stakes.push(stake(1, 3, 100));
    round.stakes.push(stake(1, 5, 50));
    let encoded = round.encode();
    assert!(Round::read(&mut &encoded[..]).is_err());
}

#[test]
fn test_round_decode_rejects_too_many_stakes() {
    let mut round = Round::new(0);
    for seed in 0..(MAX_ROUND_STAKES as u64 + 1) {
        round.stakes.push(stake(seed, (seed % 10) as u8, 1));
    }
    let encoded = round.encode();
    assert!(Round::read(&mut &encoded[..]).is_err());
}

#[test]
fn test_record_stake_updates_tallies() {
    let mut round = Round::new(0);
    round.record_stake(stake(1, 3, 100)).unwrap();
    round.record_stake(stake(2, 3, 50)).unwrap();
    round.record_stake(stake(3, 7, 20)).unwrap();

    assert_eq!(round.participant_count(), 3);
    assert_eq!(round.total_staked, 170);
    assert_eq!(round.max_per_number_total(), 150);
    assert_eq!(round.min_per_number_total(), 0);
    assert_eq!(
        round.participants_on(3),
        vec![participant(1), participant(2)]
    );
    assert!(round.contains_participant(&participant(3)));
    assert!(!round.contains_participant(&participant(4)));
}

#[test]
fn test_record_stake_rejects_out_of_range_number() {
    let mut round = Round::new(0);
    assert!(matches!(
        round.record_stake(stake(1, 10, 100)),
        Err(EngineError::NumberOutOfRange { number: 10, max: 9 })
    ));
    assert_eq!(round.participant_count(), 0);
}

#[test]
fn test_record_stake_rejects_zero_amount() {
    let mut round = Round::new(0);
    assert!(matches!(
        round.record_stake(stake(1, 0, 0)),
        Err(EngineError::ZeroStake)
    ));
}

#[test]
fn test_record_stake_rejects_duplicate_participant() {
    let mut round = Round::new(0);
    round.record_stake(stake(1, 3, 100)).unwrap();
    // Same participant, different number: still one stake per round.
    assert!(matches!(
        round.record_stake(stake(1, 5, 10)),
        Err(EngineError::DuplicateStake)
    ));
    assert_eq!(round.total_staked, 100);
}

#[test]
fn test_record_stake_rejects_settled_round() {
    let mut round = Round::new(2);
    round.winning_number = Some(4);
    assert!(matches!(
        round.record_stake(stake(1, 3, 100)),
        Err(EngineError::RoundSettled { round: 2 })
    ));
}

#[test]
fn test_record_stake_rejects_full_round() {
    let mut round = Round::new(0);
    for seed in 0..MAX_ROUND_STAKES as u64 {
        round.record_stake(stake(seed, (seed % 10) as u8, 1)).unwrap();
    }
    assert!(matches!(
        round.record_stake(stake(u64::MAX, 0, 1)),
        Err(EngineError::RoundFull { .. })
    ));
}

#[test]
fn test_validate_invariants_catches_corrupt_tally() {
    let mut round = Round::new(0);
    round.record_stake(stake(1, 3, 100)).unwrap();
    round.totals_by_number[3] = 99;
    assert!(matches!(
        round.validate_invariants(),
        Err(RoundInvariantError::TallyMismatch { number: 3, .. })
    ));
}

#[test]
fn test_validate_invariants_catches_corrupt_total() {
    let mut round = Round::new(0);
    round.record_stake(stake(1, 3, 100)).unwrap();
    round.total_staked = 1;
    assert!(matches!(
        round.validate_invariants(),
        Err(RoundInvariantError::TotalMismatch { total: 1, sum: 100 })
    ));
}

proptest! {
    // Any admitted sequence of stakes keeps the tallies consistent with
    // the stake list and survives an encode/decode cycle.
    #[test]
    fn ledger_tallies_stay_consistent(
        entries in proptest::collection::vec((0u8..10, 1u64..1_000_000), 0..50)
    ) {
        let mut round = Round::new(0);
        for (seed, (number, amount)) in entries.iter().enumerate() {
            round
                .record_stake(stake(seed as u64, *number, *amount))
                .unwrap();
        }
        round.validate_invariants().unwrap();

        let sum: u64 = entries.iter().map(|(_, amount)| amount).sum();
        prop_assert_eq!(round.total_staked, sum);
        prop_assert_eq!(
            round.totals_by_number.iter().sum::<u64>(),
            round.total_staked
        );

        let encoded = round.encode();
        let decoded = Round::read(&mut &encoded[..]).unwrap();
        prop_assert_eq!(round, decoded);
    }
}
