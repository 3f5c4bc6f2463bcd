//! Async storage abstraction for platform-agnostic wallet persistence.
//!
//! The wallet persists exactly two values: the mnemonic phrase and the index of the account
//! currently in use. Addresses and keys are always re-derived and never stored.

use crate::error::Result;
use std::future::Future;
use std::pin::Pin;

/// Type alias for storage futures.
///
/// On WASM targets, futures don't need to be `Send` since JavaScript is single-threaded.
/// On native targets, futures should be `Send` to allow use with multi-threaded runtimes.
#[cfg(target_arch = "wasm32")]
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a>>;

#[cfg(not(target_arch = "wasm32"))]
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Typed storage for wallet data.
///
/// # Example Implementation (TypeScript)
///
/// ```typescript
/// const walletStorage = new JsWalletStorageProvider(
///     async () => localStorage.getItem('mnemonic'),
///     async (mnemonic) => localStorage.setItem('mnemonic', mnemonic),
///     async () => parseInt(localStorage.getItem('account_index') ?? '0'),
///     async (index) => localStorage.setItem('account_index', index.toString()),
/// );
/// ```
#[cfg(target_arch = "wasm32")]
pub trait WalletStorage {
    /// Returns `Ok(None)` if no mnemonic has been stored.
    fn get_mnemonic(&self) -> StorageFuture<'_, Option<String>>;

    /// Store the mnemonic phrase, overwriting any existing one.
    fn set_mnemonic(&self, mnemonic: &str) -> StorageFuture<'_, ()>;

    /// Returns `Ok(0)` if not set.
    fn get_account_index(&self) -> StorageFuture<'_, u32>;

    fn set_account_index(&self, index: u32) -> StorageFuture<'_, ()>;
}

#[cfg(not(target_arch = "wasm32"))]
pub trait WalletStorage: Send + Sync {
    /// Returns `Ok(None)` if no mnemonic has been stored.
    fn get_mnemonic(&self) -> StorageFuture<'_, Option<String>>;

    /// Store the mnemonic phrase, overwriting any existing one.
    fn set_mnemonic(&self, mnemonic: &str) -> StorageFuture<'_, ()>;

    /// Returns `Ok(0)` if not set.
    fn get_account_index(&self) -> StorageFuture<'_, u32>;

    fn set_account_index(&self, index: u32) -> StorageFuture<'_, ()>;
}

/// Convenience methods built on top of [`WalletStorage`].
pub trait WalletStorageExt: WalletStorage {
    /// Move to the next account and return its index.
    fn advance_account_index(&self) -> StorageFuture<'_, u32> {
        Box::pin(async move {
            let next = self.get_account_index().await?.saturating_add(1);
            self.set_account_index(next).await?;
            Ok(next)
        })
    }
}

impl<T: WalletStorage + ?Sized> WalletStorageExt for T {}

/// In-memory wallet storage, for tests and for callers that persist nothing.
pub mod memory {
    use super::*;
    use crate::error::Error;
    use std::sync::RwLock;

    #[derive(Debug, Default)]
    pub struct InMemoryWalletStorage {
        mnemonic: RwLock<Option<String>>,
        account_index: RwLock<u32>,
    }

    impl InMemoryWalletStorage {
        pub fn new() -> Self {
            Self::default()
        }
    }

    fn poisoned<T>(_: T) -> Error {
        Error::Storage("in-memory storage lock poisoned".to_string())
    }

    impl WalletStorage for InMemoryWalletStorage {
        fn get_mnemonic(&self) -> StorageFuture<'_, Option<String>> {
            Box::pin(async move { Ok(self.mnemonic.read().map_err(poisoned)?.clone()) })
        }

        fn set_mnemonic(&self, mnemonic: &str) -> StorageFuture<'_, ()> {
            let mnemonic = mnemonic.to_string();
            Box::pin(async move {
                *self.mnemonic.write().map_err(poisoned)? = Some(mnemonic);
                Ok(())
            })
        }

        fn get_account_index(&self) -> StorageFuture<'_, u32> {
            Box::pin(async move { Ok(*self.account_index.read().map_err(poisoned)?) })
        }

        fn set_account_index(&self, index: u32) -> StorageFuture<'_, ()> {
            Box::pin(async move {
                *self.account_index.write().map_err(poisoned)? = index;
                Ok(())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryWalletStorage;
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_defaults() {
        let storage = InMemoryWalletStorage::new();
        assert_eq!(storage.get_mnemonic().await.unwrap(), None);
        assert_eq!(storage.get_account_index().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_advance_account_index() {
        let storage = InMemoryWalletStorage::new();
        assert_eq!(storage.advance_account_index().await.unwrap(), 1);
        assert_eq!(storage.advance_account_index().await.unwrap(), 2);
        assert_eq!(storage.get_account_index().await.unwrap(), 2);
    }
}
