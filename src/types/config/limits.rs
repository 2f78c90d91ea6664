//! Client and worker count types

count_newtype! {
    /// Number of logical client sessions to open
    ///
    /// # Examples
    /// ```
    /// use room_loadtest::types::ClientCount;
    ///
    /// let clients = ClientCount::new(100).unwrap();
    /// assert_eq!(clients.get(), 100);
    ///
    /// // A load test must open at least one session
    /// assert!(ClientCount::new(0).is_none());
    /// ```
    #[doc(alias = "num_clients")]
    pub struct ClientCount;
}

impl Default for ClientCount {
    fn default() -> Self {
        Self::ONE
    }
}

count_newtype! {
    /// Number of isolated worker units sharing the client load
    #[doc(alias = "threads")]
    pub struct WorkerCount;
}

impl WorkerCount {
    /// One worker per available CPU core
    #[must_use]
    pub fn available_parallelism() -> Self {
        std::thread::available_parallelism()
            .map(Self)
            .unwrap_or(Self::ONE)
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self::available_parallelism()
    }
}
