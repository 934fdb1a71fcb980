//! # Service Registry
//!
//! 인프라 컴포넌트(MongoDB, Redis, 리포지토리 번들)를 타입 기반으로 보관하는
//! 전역 컨테이너와, 서비스 싱글톤의 즉시 초기화를 위한 `inventory` 기반 레지스트리입니다.
//!
//! ## 구성
//!
//! - [`ServiceLocator`]: `TypeId` → `Arc<dyn Any>` 맵. `main`에서 `set`으로 인프라를 등록하고,
//!   서비스의 `instance()`가 `get`으로 꺼내 씁니다.
//! - [`ServiceRegistration`]: 각 서비스 모듈이 `inventory::submit!`으로 제출하는 생성자.
//!   [`ServiceLocator::initialize_all`]이 서버 기동 전에 모두 호출하여
//!   설정 누락 같은 문제를 첫 요청이 아닌 기동 시점에 드러냅니다.
//!
//! ## 등록 흐름
//!
//! ```text
//! main
//!  ├─ ServiceLocator::set(Arc<Database>)
//!  ├─ ServiceLocator::set(Arc<RedisClient>)
//!  ├─ ServiceLocator::set(Arc<Repositories>)
//!  └─ ServiceLocator::initialize_all()
//!       └─ inventory::iter::<ServiceRegistration>()
//!            ├─ TokenService::instance()
//!            ├─ TwoFactorService::instance()
//!            └─ ...
//! ```
//!
//! 서비스 자체는 `ServiceLocator`에 들어가지 않습니다. 각 서비스는 자신의
//! `OnceCell<Arc<Self>>`를 가지며, 테스트에서는 생성자에 직접 가짜 저장소를 주입합니다.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::utils::display_terminal::{print_boxed_title, print_final_summary, print_step_complete, print_step_start, print_sub_task};

/// 서비스 싱글톤 생성자 등록 정보
///
/// ```rust,ignore
/// inventory::submit! {
///     ServiceRegistration {
///         name: "token_service",
///         constructor: || Box::new(TokenService::instance()) as Box<dyn Any + Send + Sync>,
///     }
/// }
/// ```
pub struct ServiceRegistration {
    pub name: &'static str,
    pub constructor: fn() -> Box<dyn Any + Send + Sync>,
}

inventory::collect!(ServiceRegistration);

pub struct ServiceLocator {
    instances: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ServiceLocator {
    fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// 등록된 인스턴스를 조회합니다. 없으면 `None`.
    pub fn try_get<T: 'static + Send + Sync>() -> Option<Arc<T>> {
        let instances = LOCATOR
            .instances
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        instances
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|instance| instance.downcast::<T>().ok())
    }

    /// 등록된 인스턴스를 조회합니다.
    ///
    /// # Panics
    ///
    /// `main`에서 등록하지 않은 타입을 요청하면 패닉합니다. 배선 누락은
    /// 기동 단계(`initialize_all`)에서 드러나야 하는 프로그래밍 오류입니다.
    pub fn get<T: 'static + Send + Sync>() -> Arc<T> {
        match Self::try_get::<T>() {
            Some(instance) => instance,
            None => panic!(
                "ServiceLocator에 등록되지 않은 타입입니다: {}. main에서 ServiceLocator::set()으로 등록하세요",
                std::any::type_name::<T>()
            ),
        }
    }

    pub fn set<T: 'static + Send + Sync>(instance: Arc<T>) {
        let type_name = std::any::type_name::<T>();
        let clean_name = type_name.rsplit("::").next().unwrap_or(type_name);
        log::info!("📦 Registering: {}", clean_name);

        let mut instances = LOCATOR
            .instances
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        instances.insert(TypeId::of::<T>(), instance as Arc<dyn Any + Send + Sync>);
    }

    /// `inventory`로 제출된 모든 서비스 싱글톤을 생성합니다.
    pub async fn initialize_all() -> Result<(), Box<dyn std::error::Error>> {
        print_boxed_title("🔄 INITIALIZING SERVICE REGISTRY");

        let registrations: Vec<_> = inventory::iter::<ServiceRegistration>().collect();
        let service_count = registrations.len();

        print_step_start(1, "Creating Service instances");
        for registration in registrations {
            print_sub_task(registration.name, "Creating...");
            let _instance = (registration.constructor)();
            print_sub_task(registration.name, "✓ Created");
        }
        print_step_complete(1, "Service instances created", service_count);

        print_final_summary(service_count);
        Ok(())
    }
}

static LOCATOR: Lazy<ServiceLocator> = Lazy::new(ServiceLocator::new);
