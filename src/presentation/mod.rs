/// プレゼンテーション層モジュール
///
/// ドメイン層の状態とUI表示の橋渡しを行います。
/// プレゼンテーション層はドメイン層に依存しますが、その逆はありません。
///
/// # モジュール
/// - `input`: ユーザー入力処理
/// - `output`: コマンド結果の出力（人間向け・機械向け）
/// - `progress`: アップロード進捗の描画（indicatif / JSON Lines）

pub mod input;
pub mod output;
pub mod progress;
