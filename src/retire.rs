// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Interval-based retirement of cards.
//!
//! A card is retired once its review interval exceeds the threshold set in
//! its deck's retirement policy. Retirement runs either as a sweep over the
//! whole collection ([`batch`]) or as a check of a single card right after
//! it is reviewed ([`incremental`]). Both go through the same evaluator and
//! the same bulk mutations, so they agree on what gets retired.

pub mod apply;
pub mod batch;
pub mod engine;
pub mod evaluate;
pub mod incremental;
