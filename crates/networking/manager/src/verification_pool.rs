use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use alloy_primitives::B256;
use ream_bls::{BLSSignature, PubKey, traits::SignatureVerifier};
use ream_executor::ReamExecutor;
use ream_metrics::{
    SIGNATURE_VERIFICATION_JOBS, SIGNATURE_VERIFICATION_TIME, inc_int_counter_vec,
    start_timer_vec, stop_timer,
};
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    time::{Instant, timeout_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Verification job could not be queued in time")]
    Cancelled,
    #[error("Signature verification pool is shutting down")]
    ShuttingDown,
    #[error("Timed out waiting for a verification result")]
    Timeout,
    #[error("Verification backend failed: {0}")]
    Backend(String),
}

/// One signature over ``signing_root``. A set with several public keys is checked as a fast
/// aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSet {
    pub public_keys: Vec<PubKey>,
    pub signing_root: B256,
    pub signature: BLSSignature,
}

impl SignatureSet {
    pub fn single(public_key: PubKey, signing_root: B256, signature: BLSSignature) -> Self {
        Self {
            public_keys: vec![public_key],
            signing_root,
            signature,
        }
    }

    pub fn aggregate(public_keys: Vec<PubKey>, signing_root: B256, signature: BLSSignature) -> Self {
        Self {
            public_keys,
            signing_root,
            signature,
        }
    }

    fn verify(&self, verifier: &dyn SignatureVerifier) -> bool {
        let result = match self.public_keys.as_slice() {
            [public_key] => {
                verifier.verify(public_key, self.signing_root.as_slice(), &self.signature)
            }
            public_keys => verifier.fast_aggregate_verify(
                &public_keys.iter().collect::<Vec<_>>(),
                self.signing_root.as_slice(),
                &self.signature,
            ),
        };

        result.unwrap_or_else(|err| {
            debug!("Signature set failed to verify: {err}");
            false
        })
    }
}

struct VerificationJob {
    kind: &'static str,
    sets: Vec<SignatureSet>,
    result_sender: oneshot::Sender<Result<bool, VerificationError>>,
}

struct ActiveWorkerGuard(Arc<AtomicUsize>);

impl ActiveWorkerGuard {
    fn new(active_workers: Arc<AtomicUsize>) -> Self {
        active_workers.fetch_add(1, Ordering::AcqRel);
        Self(active_workers)
    }
}

impl Drop for ActiveWorkerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A fixed set of long-lived workers verifying signature batches taken from a bounded queue.
///
/// Each job is owned by exactly one worker and always gets an answer: a result, a
/// [VerificationError::ShuttingDown] when the pool stops, or a dropped channel which the
/// submitter reads the same way. A submitter which stops waiting never stalls a worker, the
/// worker skips the job or discards its result.
pub struct SignatureVerificationPool {
    job_sender: mpsc::Sender<VerificationJob>,
    cancellation_token: CancellationToken,
    active_workers: Arc<AtomicUsize>,
}

impl SignatureVerificationPool {
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        workers: usize,
        queue_limit: usize,
        executor: &ReamExecutor,
    ) -> Self {
        let (job_sender, job_receiver) = mpsc::channel(queue_limit.max(1));
        let job_receiver = Arc::new(Mutex::new(job_receiver));
        let cancellation_token = executor.cancellation_token().child_token();
        let active_workers = Arc::new(AtomicUsize::new(0));

        for worker_id in 0..workers.max(1) {
            executor.spawn(
                run_worker(
                    worker_id,
                    verifier.clone(),
                    job_receiver.clone(),
                    cancellation_token.clone(),
                    executor.clone(),
                    active_workers.clone(),
                ),
                "signature-verification-worker",
            );
        }

        Self {
            job_sender,
            cancellation_token,
            active_workers,
        }
    }

    /// Verifies every set in ``sets``, `Ok(true)` only if all of them are valid.
    ///
    /// Both queueing and waiting for the result share one deadline ``timeout`` from now.
    pub async fn verify(
        &self,
        sets: Vec<SignatureSet>,
        kind: &'static str,
        timeout: Duration,
    ) -> Result<bool, VerificationError> {
        if self.cancellation_token.is_cancelled() {
            return Err(VerificationError::ShuttingDown);
        }

        let deadline = Instant::now() + timeout;
        let (result_sender, result_receiver) = oneshot::channel();
        let job = VerificationJob {
            kind,
            sets,
            result_sender,
        };

        match timeout_at(deadline, self.job_sender.send(job)).await {
            Err(_) => {
                inc_int_counter_vec(&SIGNATURE_VERIFICATION_JOBS, &["cancelled"]);
                return Err(VerificationError::Cancelled);
            }
            Ok(Err(_)) => return Err(VerificationError::ShuttingDown),
            Ok(Ok(())) => {}
        }

        match timeout_at(deadline, result_receiver).await {
            Err(_) => {
                inc_int_counter_vec(&SIGNATURE_VERIFICATION_JOBS, &["timeout"]);
                Err(VerificationError::Timeout)
            }
            Ok(Err(_)) => Err(VerificationError::ShuttingDown),
            Ok(Ok(result)) => result,
        }
    }

    /// Number of workers still running.
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Acquire)
    }

    pub fn is_shutdown(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
    }
}

async fn run_worker(
    worker_id: usize,
    verifier: Arc<dyn SignatureVerifier>,
    job_receiver: Arc<Mutex<mpsc::Receiver<VerificationJob>>>,
    cancellation_token: CancellationToken,
    executor: ReamExecutor,
    active_workers: Arc<AtomicUsize>,
) {
    let _guard = ActiveWorkerGuard::new(active_workers);
    trace!("Signature verification worker {worker_id} started");

    loop {
        let job = {
            let mut job_receiver = job_receiver.lock().await;
            tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => break,
                job = job_receiver.recv() => job,
            }
        };

        let Some(job) = job else {
            break;
        };

        if job.result_sender.is_closed() {
            trace!("Skipping abandoned {} verification job", job.kind);
            inc_int_counter_vec(&SIGNATURE_VERIFICATION_JOBS, &["abandoned"]);
            continue;
        }

        let timer = start_timer_vec(&SIGNATURE_VERIFICATION_TIME, &[job.kind]);
        let verifier = verifier.clone();
        let sets = job.sets;
        let result = executor
            .spawn_blocking(move || sets.iter().all(|set| set.verify(verifier.as_ref())))
            .await
            .map_err(|err| {
                warn!("Signature verification task failed: {err}");
                VerificationError::Backend(err.to_string())
            });
        stop_timer(timer);

        let outcome = match &result {
            Ok(true) => "valid",
            Ok(false) => "invalid",
            Err(_) => "error",
        };
        inc_int_counter_vec(&SIGNATURE_VERIFICATION_JOBS, &[outcome]);

        if job.result_sender.send(result).is_err() {
            trace!("Discarding {} verification result, submitter is gone", job.kind);
        }
    }

    let mut job_receiver = job_receiver.lock().await;
    job_receiver.close();
    while let Ok(job) = job_receiver.try_recv() {
        let _ = job.result_sender.send(Err(VerificationError::ShuttingDown));
    }

    debug!("Signature verification worker {worker_id} stopped");
}

#[cfg(test)]
mod tests {
    use ream_bls::errors::BLSError;

    use super::*;

    /// Accepts signatures whose first byte is 1.
    struct MockVerifier {
        delay: Duration,
    }

    impl SignatureVerifier for MockVerifier {
        fn verify(
            &self,
            _pubkey: &PubKey,
            _message: &[u8],
            signature: &BLSSignature,
        ) -> Result<bool, BLSError> {
            std::thread::sleep(self.delay);
            Ok(signature.to_bytes()[0] == 1)
        }

        fn fast_aggregate_verify(
            &self,
            pubkeys: &[&PubKey],
            message: &[u8],
            signature: &BLSSignature,
        ) -> Result<bool, BLSError> {
            if pubkeys.is_empty() {
                return Err(BLSError::EmptyPublicKeys);
            }
            self.verify(pubkeys[0], message, signature)
        }
    }

    struct PanickingVerifier;

    impl SignatureVerifier for PanickingVerifier {
        fn verify(&self, _: &PubKey, _: &[u8], _: &BLSSignature) -> Result<bool, BLSError> {
            panic!("backend crashed");
        }

        fn fast_aggregate_verify(
            &self,
            _: &[&PubKey],
            _: &[u8],
            _: &BLSSignature,
        ) -> Result<bool, BLSError> {
            panic!("backend crashed");
        }
    }

    fn signature(first_byte: u8) -> BLSSignature {
        let mut bytes = [0u8; 96];
        bytes[0] = first_byte;
        BLSSignature::from_slice(&bytes).unwrap()
    }

    fn set(first_byte: u8) -> SignatureSet {
        SignatureSet::single(PubKey::default(), B256::ZERO, signature(first_byte))
    }

    fn pool(delay: Duration, workers: usize, queue_limit: usize) -> SignatureVerificationPool {
        SignatureVerificationPool::new(
            Arc::new(MockVerifier { delay }),
            workers,
            queue_limit,
            &ReamExecutor::current(),
        )
    }

    async fn wait_for_workers(pool: &SignatureVerificationPool, expected: usize) {
        for _ in 0..100 {
            if pool.active_workers() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {expected} workers, found {}",
            pool.active_workers()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_batch_is_valid_only_if_every_set_is() {
        let pool = pool(Duration::ZERO, 2, 8);
        let timeout = Duration::from_secs(5);

        assert_eq!(pool.verify(vec![set(1), set(1)], "test", timeout).await, Ok(true));
        assert_eq!(pool.verify(vec![set(1), set(2)], "test", timeout).await, Ok(false));

        let empty_aggregate = SignatureSet::aggregate(vec![], B256::ZERO, signature(1));
        assert_eq!(pool.verify(vec![empty_aggregate], "test", timeout).await, Ok(false));
    }

    #[tokio::test]
    async fn test_workers_are_counted_once_running() {
        let pool = pool(Duration::ZERO, 2, 8);

        // The current-thread runtime hasn't polled the workers yet
        assert_eq!(pool.active_workers(), 0);
        wait_for_workers(&pool, 2).await;
        assert_eq!(
            pool.verify(vec![set(1)], "test", Duration::from_secs(5)).await,
            Ok(true)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_jobs_do_not_leak_workers() {
        let pool = pool(Duration::from_millis(20), 2, 32);
        wait_for_workers(&pool, 2).await;

        for _ in 0..10 {
            assert_eq!(
                pool.verify(vec![set(1)], "test", Duration::from_millis(1)).await,
                Err(VerificationError::Timeout)
            );
        }

        assert_eq!(
            pool.verify(vec![set(1)], "test", Duration::from_secs(5)).await,
            Ok(true)
        );
        assert_eq!(pool.active_workers(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_queue_cancels_submission() {
        let pool = pool(Duration::from_millis(200), 1, 1);
        let timeout = Duration::from_millis(20);

        let results = submit_four(&pool, timeout).await;
        assert!(results.contains(&Err(VerificationError::Cancelled)));
    }

    async fn submit_four(
        pool: &SignatureVerificationPool,
        timeout: Duration,
    ) -> Vec<Result<bool, VerificationError>> {
        let (a, b, c, d) = tokio::join!(
            pool.verify(vec![set(1)], "test", timeout),
            pool.verify(vec![set(1)], "test", timeout),
            pool.verify(vec![set(1)], "test", timeout),
            pool.verify(vec![set(1)], "test", timeout),
        );
        vec![a, b, c, d]
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_backend_panic_is_reported() {
        let pool = SignatureVerificationPool::new(
            Arc::new(PanickingVerifier),
            1,
            4,
            &ReamExecutor::current(),
        );

        assert!(matches!(
            pool.verify(vec![set(1)], "test", Duration::from_secs(5)).await,
            Err(VerificationError::Backend(_))
        ));
        assert_eq!(pool.active_workers(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_stops_workers() {
        let pool = pool(Duration::ZERO, 3, 8);
        wait_for_workers(&pool, 3).await;

        pool.shutdown();
        assert!(pool.is_shutdown());
        assert_eq!(
            pool.verify(vec![set(1)], "test", Duration::from_secs(1)).await,
            Err(VerificationError::ShuttingDown)
        );
        wait_for_workers(&pool, 0).await;
    }
}
