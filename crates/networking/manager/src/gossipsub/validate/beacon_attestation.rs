use anyhow::bail;
use ream_consensus_beacon::attestation_record::AttestationRecord;
use ream_consensus_misc::{
    constants::beacon::{DOMAIN_BEACON_ATTESTER, MAX_COMMITTEES_PER_SLOT},
    misc::{compute_signing_root, compute_subnet_for_attestation},
};
use tracing::trace;

use super::{
    GossipValidator, Origin,
    result::{ValidationResult, VerifiedAttestation},
};
use crate::{gossipsub::attestation::GossipAttestation, verification_pool::SignatureSet};

/// Validates an unaggregated attestation published on subnet ``subnet_id``.
pub async fn validate_beacon_attestation(
    validator: &GossipValidator,
    attestation: &AttestationRecord,
    subnet_id: u64,
    origin: Origin,
) -> anyhow::Result<ValidationResult> {
    let data = attestation.data();
    let target_epoch = data.target.epoch;

    if origin == Origin::Gossip
        && let Some(result) = validator.check_propagation_range(data.slot)
    {
        return Ok(result);
    }

    // [REJECT] The attestation's epoch matches its target
    if !data.is_target_epoch_consistent() {
        return Ok(ValidationResult::Reject(
            "The attestation's epoch doesn't match its target".to_string(),
        ));
    }

    let committee_index = match attestation {
        AttestationRecord::Single(single_attestation) => {
            // [REJECT] attestation.data.index == 0
            if single_attestation.data.index != 0 {
                return Ok(ValidationResult::Reject(
                    "attestation.data.index must be 0".to_string(),
                ));
            }
            single_attestation.committee_index
        }
        AttestationRecord::Phase0(phase0_attestation) => {
            // [REJECT] The attestation is unaggregated, it has exactly one participating
            // validator
            if phase0_attestation.aggregation_bits.num_set_bits() != 1 {
                return Ok(ValidationResult::Reject(
                    "The attestation must have exactly one participant".to_string(),
                ));
            }
            phase0_attestation.data.index
        }
        AttestationRecord::Electra(_) => {
            return Ok(ValidationResult::Reject(
                "Aggregate attestation published on a subnet topic".to_string(),
            ));
        }
    };

    if committee_index >= MAX_COMMITTEES_PER_SLOT {
        return Ok(ValidationResult::Reject(
            "The committee index is not within the expected range".to_string(),
        ));
    }

    // [IGNORE] There has been no other valid attestation seen on an attestation subnet that has
    // an identical attestation.data.target.epoch and participating validator index.
    if let AttestationRecord::Single(single_attestation) = attestation
        && validator
            .observed_attesters
            .is_observed(target_epoch, single_attestation.attester_index)
    {
        return Ok(ValidationResult::Ignore(
            "An attestation from this attester was already seen".to_string(),
        ));
    }

    if let Some(result) = validator
        .check_voted_block(data, origin, || GossipAttestation::Unaggregated {
            attestation: attestation.clone(),
            subnet_id,
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

    // [REJECT] The committee index is within the expected range
    if committee_index >= committees_per_slot {
        return Ok(ValidationResult::Reject(
            "The committee index is not within the expected range".to_string(),
        ));
    }

    // [IGNORE] The attestation is for the subnet of the topic it was published on
    if compute_subnet_for_attestation(
        committees_per_slot,
        data.slot,
        committee_index,
        validator.network_spec.attestation_subnet_count,
    ) != subnet_id
    {
        return Ok(ValidationResult::Ignore(
            "The attestation is not for the subnet it was published on".to_string(),
        ));
    }

    let committee = validator
        .chain
        .beacon_committee(block_root, data.slot, committee_index)
        .await?;

    let (attester_index, verified_attestation) = match attestation {
        AttestationRecord::Single(single_attestation) => {
            // [REJECT] The attester is a member of the committee
            if !committee.contains(&single_attestation.attester_index) {
                return Ok(ValidationResult::Reject(
                    "The attester is not a member of the committee".to_string(),
                ));
            }
            (
                single_attestation.attester_index,
                AttestationRecord::Electra(single_attestation.to_attestation(&committee)?),
            )
        }
        AttestationRecord::Phase0(phase0_attestation) => {
            // [REJECT] The number of aggregation bits matches the committee size
            if phase0_attestation.aggregation_bits.len() != committee.len() {
                return Ok(ValidationResult::Reject(
                    "The number of aggregation bits doesn't match the committee size".to_string(),
                ));
            }
            let Some(attester_index) = attestation
                .participant_positions()
                .and_then(|positions| positions.first().map(|position| committee[*position]))
            else {
                bail!("Unaggregated attestation lost its participant");
            };
            (attester_index, attestation.clone())
        }
        AttestationRecord::Electra(_) => bail!("Aggregate attestation reached committee checks"),
    };

    // [IGNORE] There has been no other valid attestation seen on an attestation subnet that has
    // an identical attestation.data.target.epoch and participating validator index.
    if validator
        .observed_attesters
        .is_observed(target_epoch, attester_index)
    {
        return Ok(ValidationResult::Ignore(
            "An attestation from this attester was already seen".to_string(),
        ));
    }

    let pattern = verified_attestation
        .aggregation_pattern()
        .unwrap_or_default();
    if validator
        .seen_cache
        .seen(data.slot, committee_index, &pattern)
    {
        return Ok(ValidationResult::Ignore(
            "The attestation was already seen".to_string(),
        ));
    }

    // [REJECT] The signature of attestation is valid.
    let public_key = validator.chain.validator_public_key(attester_index).await?;
    let signing_root = compute_signing_root(
        data,
        validator.domain(DOMAIN_BEACON_ATTESTER, target_epoch),
    );
    if let Some(result) = validator
        .verify_signature_sets(
            vec![SignatureSet::single(
                public_key,
                signing_root,
                attestation.signature().clone(),
            )],
            "attestation",
        )
        .await
    {
        return Ok(result);
    }

    if !validator
        .observed_attesters
        .observe(target_epoch, attester_index)
    {
        return Ok(ValidationResult::Ignore(
            "An attestation from this attester was already seen".to_string(),
        ));
    }
    validator
        .seen_cache
        .mark(data.slot, committee_index, pattern);

    let verified = VerifiedAttestation {
        attestation: verified_attestation,
        committee,
        attesting_indices: vec![attester_index],
        aggregator_index: None,
        subnet_id: Some(subnet_id),
    };
    validator
        .attestation_sink
        .submit_attestation(&verified, verified.is_aggregated());
    trace!(
        "Accepted attestation from validator {attester_index} for slot {}",
        data.slot
    );

    Ok(ValidationResult::Accept)
}
