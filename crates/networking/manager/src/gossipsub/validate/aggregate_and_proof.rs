use ream_consensus_beacon::attestation_record::SignedAggregate;
use ream_consensus_misc::{
    constants::beacon::{
        DOMAIN_AGGREGATE_AND_PROOF, DOMAIN_BEACON_ATTESTER, DOMAIN_SELECTION_PROOF,
        MAX_COMMITTEES_PER_SLOT,
    },
    misc::{compute_epoch_at_slot, compute_signing_root, is_aggregator},
};
use tracing::trace;

use super::{
    GossipValidator, Origin,
    result::{ValidationResult, VerifiedAttestation},
};
use crate::{gossipsub::attestation::GossipAttestation, verification_pool::SignatureSet};

pub async fn validate_aggregate_and_proof(
    validator: &GossipValidator,
    signed_aggregate: &SignedAggregate,
    origin: Origin,
) -> anyhow::Result<ValidationResult> {
    let data = signed_aggregate.data();
    let aggregate = signed_aggregate.aggregate();
    let aggregator_index = signed_aggregate.aggregator_index();
    let target_epoch = data.target.epoch;

    if origin == Origin::Gossip
        && let Some(result) = validator.check_propagation_range(data.slot)
    {
        return Ok(result);
    }

    // [REJECT] The aggregate attestation's epoch matches its target
    if !data.is_target_epoch_consistent() {
        return Ok(ValidationResult::Reject(
            "The aggregate attestation's epoch doesn't match its target".to_string(),
        ));
    }

    // [REJECT] The aggregate attestation has participants
    if aggregate.num_participants() == 0 {
        return Ok(ValidationResult::Reject(
            "The aggregate attestation has no participants".to_string(),
        ));
    }

    let committee_index = match signed_aggregate {
        SignedAggregate::Electra(signed) => {
            // [REJECT] aggregate.data.index == 0
            if signed.message.aggregate.data.index != 0 {
                return Ok(ValidationResult::Reject(
                    "aggregate.data.index must be 0".to_string(),
                ));
            }

            // [REJECT] len(committee_indices) == 1
            match aggregate.committee_index() {
                Some(committee_index) => committee_index,
                None => {
                    return Ok(ValidationResult::Reject(
                        "The aggregate must name exactly one committee".to_string(),
                    ));
                }
            }
        }
        SignedAggregate::Phase0(signed) => signed.message.aggregate.data.index,
    };

    if committee_index >= MAX_COMMITTEES_PER_SLOT {
        return Ok(ValidationResult::Reject(
            "The committee index is not within the expected range".to_string(),
        ));
    }

    // [IGNORE] A valid aggregate attestation defined by hash_tree_root(aggregate.data) whose
    // aggregation_bits is a non-strict superset has not already been seen.
    let pattern = aggregate.aggregation_pattern().unwrap_or_default();
    if validator
        .seen_cache
        .seen(data.slot, committee_index, &pattern)
        || validator
            .seen_cache
            .is_subset_of_seen(data.slot, committee_index, &pattern)
    {
        return Ok(ValidationResult::Ignore(
            "An aggregate covering these participants was already seen".to_string(),
        ));
    }

    // [IGNORE] The aggregate is the first valid aggregate received for the aggregator with
    // index aggregate_and_proof.aggregator_index for the epoch aggregate.data.target.epoch.
    if validator
        .observed_aggregators
        .is_observed(target_epoch, aggregator_index)
    {
        return Ok(ValidationResult::Ignore(
            "An aggregate from this aggregator was already seen for the epoch".to_string(),
        ));
    }

    if let Some(result) = validator
        .check_voted_block(data, origin, || {
            GossipAttestation::Aggregate(signed_aggregate.clone())
        })
        .await?
    {
        return Ok(result);
    }

    let block_root = data.beacon_block_root;
    let committees_per_slot = validator
        .chain
        .committee_count_per_slot(block_root, target_epoch)
        .await?;
    if committee_index >= committees_per_slot {
        return Ok(ValidationResult::Reject(
            "The committee index is not within the expected range".to_string(),
        ));
    }

    let committee = validator
        .chain
        .beacon_committee(block_root, data.slot, committee_index)
        .await?;

    // [REJECT] The number of aggregation bits matches the committee size
    if aggregate.aggregation_bits_len() != Some(committee.len()) {
        return Ok(ValidationResult::Reject(
            "The number of aggregation bits doesn't match the committee size".to_string(),
        ));
    }

    // [REJECT] The aggregator's validator index is within the committee
    if !committee.contains(&aggregator_index) {
        return Ok(ValidationResult::Reject(
            "The aggregator is not a member of the committee".to_string(),
        ));
    }

    // [REJECT] aggregate_and_proof.selection_proof selects the validator as an aggregator for
    // the slot
    if !is_aggregator(committee.len(), signed_aggregate.selection_proof()) {
        return Ok(ValidationResult::Reject(
            "The selection proof doesn't select the validator as an aggregator".to_string(),
        ));
    }

    let attesting_indices: Vec<u64> = aggregate
        .participant_positions()
        .unwrap_or_default()
        .into_iter()
        .map(|position| committee[position])
        .collect();

    // [REJECT] The aggregate_and_proof.selection_proof is a valid signature of the
    // aggregate.data.slot by the validator with index aggregate_and_proof.aggregator_index.
    // [REJECT] The aggregator signature, signed_aggregate_and_proof.signature, is valid.
    // [REJECT] The signature of aggregate is valid.
    let aggregator_public_key = validator.chain.validator_public_key(aggregator_index).await?;
    let attester_public_keys = validator.public_keys(&attesting_indices).await?;
    let slot_epoch = compute_epoch_at_slot(data.slot);
    let signature_sets = vec![
        SignatureSet::single(
            aggregator_public_key.clone(),
            compute_signing_root(
                data.slot,
                validator.domain(DOMAIN_SELECTION_PROOF, slot_epoch),
            ),
            signed_aggregate.selection_proof().clone(),
        ),
        SignatureSet::single(
            aggregator_public_key,
            compute_signing_root(
                signed_aggregate.message_root(),
                validator.domain(DOMAIN_AGGREGATE_AND_PROOF, slot_epoch),
            ),
            signed_aggregate.signature().clone(),
        ),
        SignatureSet::aggregate(
            attester_public_keys,
            compute_signing_root(
                data,
                validator.domain(DOMAIN_BEACON_ATTESTER, target_epoch),
            ),
            aggregate.signature().clone(),
        ),
    ];
    if let Some(result) = validator
        .verify_signature_sets(signature_sets, "aggregate_and_proof")
        .await
    {
        return Ok(result);
    }

    if !validator
        .observed_aggregators
        .observe(target_epoch, aggregator_index)
    {
        return Ok(ValidationResult::Ignore(
            "An aggregate from this aggregator was already seen for the epoch".to_string(),
        ));
    }
    validator
        .seen_cache
        .mark(data.slot, committee_index, pattern);

    let verified = VerifiedAttestation {
        attestation: aggregate,
        committee,
        attesting_indices,
        aggregator_index: Some(aggregator_index),
        subnet_id: None,
    };
    validator
        .attestation_sink
        .submit_attestation(&verified, verified.is_aggregated());
    trace!(
        "Accepted aggregate from aggregator {aggregator_index} for slot {}",
        data.slot
    );

    Ok(ValidationResult::Accept)
}
